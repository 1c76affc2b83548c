//! Roll modifier chain
//!
//! Modifiers transform a natural d20 roll before categorization. An actor
//! carries a chain registered with the [`RollModificationManager`], and each
//! action may declare its own; actor modifiers run first, then the action's,
//! all threading one [`RollContext`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::actor::{Action, ActionId, ActorId};
use super::dice::{DiceRoller, D20};

/// Default bound on chained explosions
pub const DEFAULT_MAX_EXPLOSIONS: u32 = 32;

/// Per-resolution context handed to every modifier in a chain
pub struct RollContext<'a> {
    pub actor: ActorId,
    pub target: Option<ActorId>,
    pub action: Option<ActionId>,
    pub dice: &'a mut DiceRoller,
    /// Upper bound on chained explosions
    pub max_explosions: u32,
}

impl<'a> RollContext<'a> {
    pub fn new(actor: ActorId, dice: &'a mut DiceRoller) -> Self {
        Self {
            actor,
            target: None,
            action: None,
            dice,
            max_explosions: DEFAULT_MAX_EXPLOSIONS,
        }
    }

    pub fn with_target(mut self, target: Option<ActorId>) -> Self {
        self.target = target;
        self
    }

    pub fn with_action(mut self, action: Option<ActionId>) -> Self {
        self.action = action;
        self
    }

    pub fn with_max_explosions(mut self, max_explosions: u32) -> Self {
        self.max_explosions = max_explosions;
        self
    }
}

/// A single roll transformation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RollModifier {
    /// Add a flat amount; the result may leave 1..20
    Additive { amount: i32 },
    /// Scale and round half away from zero, never below 1
    Multiplicative { factor: f64 },
    /// Clamp into an inclusive range
    Clamp { min: i32, max: i32 },
    /// Replace the roll with a fresh d20 with the given probability
    Reroll { probability: f64 },
    /// Add fresh d20s while the roll meets the threshold
    ExplodingDice { threshold: i32 },
}

impl RollModifier {
    pub fn additive(amount: i32) -> Self {
        RollModifier::Additive { amount }
    }

    pub fn multiplicative(factor: f64) -> Self {
        RollModifier::Multiplicative { factor }
    }

    /// Clamp modifier; a reversed range is swapped
    pub fn clamp(min: i32, max: i32) -> Self {
        if min > max {
            RollModifier::Clamp { min: max, max: min }
        } else {
            RollModifier::Clamp { min, max }
        }
    }

    /// Reroll modifier; the probability is forced into [0, 1] and NaN means never
    pub fn reroll(probability: f64) -> Self {
        let probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        RollModifier::Reroll { probability }
    }

    pub fn exploding(threshold: i32) -> Self {
        RollModifier::ExplodingDice { threshold }
    }

    /// Apply this modifier to a roll
    pub fn modify(&self, roll: i32, ctx: &mut RollContext<'_>) -> i32 {
        match *self {
            RollModifier::Additive { amount } => roll.saturating_add(amount),
            RollModifier::Multiplicative { factor } => {
                let scaled = (roll as f64 * factor).round();
                if scaled.is_nan() || scaled < 1.0 {
                    1
                } else if scaled >= i32::MAX as f64 {
                    i32::MAX
                } else {
                    scaled as i32
                }
            }
            RollModifier::Clamp { min, max } => {
                let (lo, hi) = if min > max { (max, min) } else { (min, max) };
                roll.clamp(lo, hi)
            }
            RollModifier::Reroll { probability } => {
                let p = if probability.is_nan() { 0.0 } else { probability };
                if ctx.dice.chance() < p {
                    let fresh = ctx.dice.roll_d20();
                    debug!(actor = %ctx.actor, from = roll, to = fresh, "roll rerolled");
                    fresh
                } else {
                    roll
                }
            }
            RollModifier::ExplodingDice { threshold } => {
                if roll < threshold {
                    return roll;
                }
                let mut total = roll;
                let mut explosions = 0;
                while explosions < ctx.max_explosions {
                    let extra = ctx.dice.roll_d20();
                    total = total.saturating_add(extra);
                    explosions += 1;
                    if extra < threshold {
                        break;
                    }
                }
                debug!(actor = %ctx.actor, explosions, total, "dice exploded");
                total
            }
        }
    }
}

impl std::fmt::Display for RollModifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RollModifier::Additive { amount } => write!(f, "{:+}", amount),
            RollModifier::Multiplicative { factor } => write!(f, "x{}", factor),
            RollModifier::Clamp { min, max } => write!(f, "clamp[{}..{}]", min, max),
            RollModifier::Reroll { probability } => write!(f, "reroll({})", probability),
            RollModifier::ExplodingDice { threshold } => write!(f, "explode({}+ on d{})", threshold, D20),
        }
    }
}

/// Apply a chain of modifiers in order
pub fn apply_chain(roll: i32, modifiers: &[RollModifier], ctx: &mut RollContext<'_>) -> i32 {
    modifiers.iter().fold(roll, |current, modifier| modifier.modify(current, ctx))
}

/// Actor-level modifier chains for a session
#[derive(Debug, Clone)]
pub struct RollModificationManager {
    chains: HashMap<ActorId, Vec<RollModifier>>,
    max_explosions: u32,
}

impl Default for RollModificationManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXPLOSIONS)
    }
}

impl RollModificationManager {
    pub fn new(max_explosions: u32) -> Self {
        Self {
            chains: HashMap::new(),
            max_explosions,
        }
    }

    /// Append a modifier to an actor's chain
    pub fn register(&mut self, actor: ActorId, modifier: RollModifier) {
        debug!(actor = %actor, %modifier, "roll modifier registered");
        self.chains.entry(actor).or_default().push(modifier);
    }

    /// Drop every modifier registered for an actor
    pub fn clear_actor(&mut self, actor: ActorId) {
        self.chains.remove(&actor);
    }

    pub fn modifiers_for(&self, actor: ActorId) -> &[RollModifier] {
        self.chains.get(&actor).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Run the actor chain, then the action chain, over a natural roll
    pub fn apply_action_roll_modifications(
        &self,
        base_roll: i32,
        action: Option<&Action>,
        actor: ActorId,
        target: Option<ActorId>,
        dice: &mut DiceRoller,
    ) -> i32 {
        let mut ctx = RollContext::new(actor, dice)
            .with_target(target)
            .with_action(action.map(|a| a.id))
            .with_max_explosions(self.max_explosions);

        let after_actor = apply_chain(base_roll, self.modifiers_for(actor), &mut ctx);
        let modified = match action {
            Some(action) => apply_chain(after_actor, &action.roll_modifiers, &mut ctx),
            None => after_actor,
        };

        if modified != base_roll {
            debug!(actor = %actor, base_roll, modified, "roll modified");
        }
        modified
    }
}
