//! combo-sim - roll and combo simulator

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use combo_engine::combat::{
    aggregate, Action, Actor, CombatEventType, CombatSession, ComboTransition, ConditionalTrigger,
    DiceMode, DiceRoll, DiceRoller, EffectKind, ResolveRequest, RollCategory, StackKind,
    ThresholdHitCheck, TriggerCondition,
};
use combo_engine::EngineConfig;
use parking_lot::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Combat roll and combo simulator
#[derive(Parser, Debug)]
#[command(
    name = "combo-sim",
    version,
    about = "Roll dice and simulate combo resolution"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Roll dice notation like "2d6+3"
    Roll {
        notation: String,

        /// Aggregation: sum, highest, lowest, average
        #[arg(short, long, default_value = "sum")]
        mode: DiceMode,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Resolve many rolls for a demo attacker and report the distribution
    Simulate {
        #[arg(short, long, default_value_t = 1000)]
        rolls: u32,

        /// Roll bonus added to every attack
        #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
        bonus: i32,

        /// Number of actions in the combo sequence
        #[arg(short = 'l', long, default_value_t = 3)]
        combo_length: u32,

        /// Overrides the configured seed
        #[arg(long)]
        seed: Option<u64>,

        /// TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print every event as a JSON line
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "combo_engine=info,combo_sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match args.command {
        Command::Roll {
            notation,
            mode,
            seed,
        } => roll(&notation, mode, seed),
        Command::Simulate {
            rolls,
            bonus,
            combo_length,
            seed,
            config,
            json,
        } => {
            let mut engine = EngineConfig::load(config.as_deref())
                .with_context(|| "failed to load configuration")?;
            if seed.is_some() {
                engine.dice.seed = seed;
            }
            simulate(&engine, rolls, bonus, combo_length, json)
        }
    }
}

fn roll(notation: &str, mode: DiceMode, seed: Option<u64>) -> Result<()> {
    let dice_roll: DiceRoll = notation.parse()?;
    let mut dice = DiceRoller::with_seed(seed);

    let (results, _) = dice_roll.roll_detailed(&mut dice)?;
    let total = aggregate(&results, mode) + dice_roll.modifier;
    println!("{} {:?} => {}", dice_roll, results, total);
    Ok(())
}

fn simulate(
    engine: &EngineConfig,
    rolls: u32,
    bonus: i32,
    combo_length: u32,
    json: bool,
) -> Result<()> {
    let mut session = CombatSession::new(engine);

    // The opener exposes the target whenever it lands as a combo
    let mut attacker = Actor::new("Attacker");
    for i in 0..combo_length {
        let mut action = Action::new(format!("Move {}", i + 1)).combo();
        if i == 0 {
            action = action.with_trigger(
                ConditionalTrigger::new(
                    vec![TriggerCondition::OnComboHit],
                    EffectKind::Stack(StackKind::Expose),
                )
                .on_target(),
            );
        }
        let id = attacker.learn(action);
        attacker.add_to_combo(id)?;
    }
    let mut dummy = Actor::new("Dummy");

    if json {
        let out = Arc::new(Mutex::new(std::io::stdout()));
        let bus = session.bus();
        for event_type in [
            CombatEventType::ActionExecuted,
            CombatEventType::ActionHit,
            CombatEventType::ActionMiss,
            CombatEventType::EffectApplied,
        ] {
            let out = Arc::clone(&out);
            bus.subscribe(event_type, move |event| {
                use std::io::Write;
                let line = serde_json::to_string(event)?;
                writeln!(out.lock(), "{}", line)?;
                Ok(())
            });
        }
    }

    info!(rolls, bonus, combo_length, "starting simulation");

    let mut histogram: HashMap<RollCategory, u32> = HashMap::new();
    let mut streak = 0u32;
    let mut longest_streak = 0u32;
    let mut cycles = 0u32;

    for _ in 0..rolls {
        let res = session.resolve(
            &mut attacker,
            Some(&mut dummy),
            ResolveRequest::with_bonus(bonus),
            &ThresholdHitCheck,
        )?;
        *histogram.entry(res.outcome.category).or_default() += 1;

        match res.transition {
            ComboTransition::Advanced { wrapped, .. } => {
                streak += 1;
                longest_streak = longest_streak.max(streak);
                if wrapped {
                    cycles += 1;
                }
            }
            ComboTransition::Reset { .. } => streak = 0,
            ComboTransition::Unchanged => {
                if res.outcome.is_miss {
                    streak = 0;
                }
            }
        }
    }

    if !json {
        println!("{} rolls, bonus {:+}, combo length {}", rolls, bonus, combo_length);
        for category in RollCategory::all() {
            let count = histogram.get(category).copied().unwrap_or(0);
            let pct = if rolls == 0 {
                0.0
            } else {
                count as f64 * 100.0 / rolls as f64
            };
            println!("  {:<15} {:>7} ({:5.1}%)", category.to_string(), count, pct);
        }
        println!("longest combo streak: {}", longest_streak);
        println!("full combo cycles: {}", cycles);
        println!(
            "dummy expose stacks: {} (armor 10 -> {})",
            dummy.effects.stacks(StackKind::Expose),
            dummy.effects.effective_armor(10, &engine.effects)
        );
    }

    Ok(())
}
