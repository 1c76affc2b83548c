//! Status effect stacks
//!
//! Effects are plain counters rather than timed instances:
//! - stacking kinds (poison, fortify, expose, ...) accumulate per application
//! - flag kinds (pierce, silence, mark) are either on or off
//! - Cleanse strips debuff stacks, Disrupt resets the combo step
//!
//! Counters feed the armor math through [`EffectStacks::armor_adjustment`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Effects that accumulate as counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackKind {
    Vulnerability,
    Harden,
    Fortify,
    Expose,
    HpRegen,
    ArmorBreak,
    Focus,
    Reflect,
    Poison,
}

impl StackKind {
    pub const COUNT: usize = 9;

    pub fn all() -> &'static [StackKind] {
        &[
            StackKind::Vulnerability,
            StackKind::Harden,
            StackKind::Fortify,
            StackKind::Expose,
            StackKind::HpRegen,
            StackKind::ArmorBreak,
            StackKind::Focus,
            StackKind::Reflect,
            StackKind::Poison,
        ]
    }

    fn index(self) -> usize {
        match self {
            StackKind::Vulnerability => 0,
            StackKind::Harden => 1,
            StackKind::Fortify => 2,
            StackKind::Expose => 3,
            StackKind::HpRegen => 4,
            StackKind::ArmorBreak => 5,
            StackKind::Focus => 6,
            StackKind::Reflect => 7,
            StackKind::Poison => 8,
        }
    }

    /// Whether Cleanse removes stacks of this kind
    pub fn is_debuff(&self) -> bool {
        matches!(
            self,
            StackKind::Poison | StackKind::Vulnerability | StackKind::Expose
        )
    }
}

/// Effects that are simply present or absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    Pierce,
    Silence,
    Mark,
}

/// Anything a trigger can apply to an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Stack(StackKind),
    Flag(FlagKind),
    /// Reset the recipient's combo step
    Disrupt,
    /// Strip debuff stacks
    Cleanse,
}

impl FromStr for EffectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-' && *c != ' ')
            .collect::<String>()
            .to_lowercase();
        let kind = match normalized.as_str() {
            "vulnerability" | "vulnerable" => EffectKind::Stack(StackKind::Vulnerability),
            "harden" => EffectKind::Stack(StackKind::Harden),
            "fortify" => EffectKind::Stack(StackKind::Fortify),
            "expose" | "exposed" => EffectKind::Stack(StackKind::Expose),
            "hpregen" | "regen" => EffectKind::Stack(StackKind::HpRegen),
            "armorbreak" => EffectKind::Stack(StackKind::ArmorBreak),
            "focus" => EffectKind::Stack(StackKind::Focus),
            "reflect" => EffectKind::Stack(StackKind::Reflect),
            "poison" | "poisoned" => EffectKind::Stack(StackKind::Poison),
            "pierce" => EffectKind::Flag(FlagKind::Pierce),
            "silence" | "silenced" => EffectKind::Flag(FlagKind::Silence),
            "mark" | "marked" => EffectKind::Flag(FlagKind::Mark),
            "disrupt" => EffectKind::Disrupt,
            "cleanse" => EffectKind::Cleanse,
            _ => return Err(format!("unknown effect: {}", s)),
        };
        Ok(kind)
    }
}

impl std::fmt::Display for EffectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EffectKind::Stack(StackKind::Vulnerability) => "vulnerability",
            EffectKind::Stack(StackKind::Harden) => "harden",
            EffectKind::Stack(StackKind::Fortify) => "fortify",
            EffectKind::Stack(StackKind::Expose) => "expose",
            EffectKind::Stack(StackKind::HpRegen) => "hp_regen",
            EffectKind::Stack(StackKind::ArmorBreak) => "armor_break",
            EffectKind::Stack(StackKind::Focus) => "focus",
            EffectKind::Stack(StackKind::Reflect) => "reflect",
            EffectKind::Stack(StackKind::Poison) => "poison",
            EffectKind::Flag(FlagKind::Pierce) => "pierce",
            EffectKind::Flag(FlagKind::Silence) => "silence",
            EffectKind::Flag(FlagKind::Mark) => "mark",
            EffectKind::Disrupt => "disrupt",
            EffectKind::Cleanse => "cleanse",
        };
        write!(f, "{}", s)
    }
}

/// Tuning for stack application and the armor math
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectConfig {
    /// Stacks added per application
    pub stacks_per_application: u32,
    /// Optional cap per stack kind
    pub max_stacks: Option<u32>,
    /// Stacks removed per debuff kind by one Cleanse
    pub cleanse_amount: u32,
    pub fortify_armor_per_stack: i32,
    pub armor_break_per_stack: i32,
    pub expose_armor_per_stack: i32,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            stacks_per_application: 1,
            max_stacks: None,
            cleanse_amount: 1,
            fortify_armor_per_stack: 2,
            armor_break_per_stack: 1,
            expose_armor_per_stack: 1,
        }
    }
}

/// What applying an effect changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectChange {
    Stacked { stack: StackKind, before: u32, after: u32 },
    Flagged { flag: FlagKind, already_set: bool },
    Cleansed { removed: Vec<(StackKind, u32)> },
    Disrupted,
}

/// Per-actor effect counters; every kind is always present
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectStacks {
    stacks: [u32; StackKind::COUNT],
    pierce: bool,
    silence: bool,
    mark: bool,
}

impl EffectStacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stacks(&self, kind: StackKind) -> u32 {
        self.stacks[kind.index()]
    }

    pub fn set_stacks(&mut self, kind: StackKind, count: u32) {
        self.stacks[kind.index()] = count;
    }

    pub fn has_flag(&self, flag: FlagKind) -> bool {
        match flag {
            FlagKind::Pierce => self.pierce,
            FlagKind::Silence => self.silence,
            FlagKind::Mark => self.mark,
        }
    }

    pub fn set_flag(&mut self, flag: FlagKind, value: bool) {
        match flag {
            FlagKind::Pierce => self.pierce = value,
            FlagKind::Silence => self.silence = value,
            FlagKind::Mark => self.mark = value,
        }
    }

    /// Apply one effect
    ///
    /// Disrupt touches no counter here; the owning actor resets its combo.
    pub fn apply(&mut self, kind: EffectKind, config: &EffectConfig) -> EffectChange {
        match kind {
            EffectKind::Stack(stack) => {
                let before = self.stacks(stack);
                let mut after = before.saturating_add(config.stacks_per_application);
                if let Some(cap) = config.max_stacks {
                    after = after.min(cap.max(before));
                }
                self.set_stacks(stack, after);
                debug!(effect = %kind, before, after, "effect stacked");
                EffectChange::Stacked { stack, before, after }
            }
            EffectKind::Flag(flag) => {
                let already_set = self.has_flag(flag);
                self.set_flag(flag, true);
                EffectChange::Flagged { flag, already_set }
            }
            EffectKind::Cleanse => {
                let mut removed = Vec::new();
                for stack in StackKind::all().iter().copied().filter(StackKind::is_debuff) {
                    let before = self.stacks(stack);
                    let after = before.saturating_sub(config.cleanse_amount);
                    if after != before {
                        self.set_stacks(stack, after);
                        removed.push((stack, before - after));
                    }
                }
                debug!(?removed, "effects cleansed");
                EffectChange::Cleansed { removed }
            }
            EffectKind::Disrupt => EffectChange::Disrupted,
        }
    }

    // Armor math saturates; counters are uncapped unless configured
    fn armor_from(&self, kind: StackKind, per_stack: i32) -> i32 {
        i32::try_from(self.stacks(kind))
            .unwrap_or(i32::MAX)
            .saturating_mul(per_stack)
    }

    /// Armor granted by Fortify stacks
    pub fn fortify_armor_bonus(&self, config: &EffectConfig) -> i32 {
        self.armor_from(StackKind::Fortify, config.fortify_armor_per_stack)
    }

    /// Net armor change from Fortify, ArmorBreak and Expose
    pub fn armor_adjustment(&self, config: &EffectConfig) -> i32 {
        self.fortify_armor_bonus(config)
            .saturating_sub(self.armor_from(StackKind::ArmorBreak, config.armor_break_per_stack))
            .saturating_sub(self.armor_from(StackKind::Expose, config.expose_armor_per_stack))
    }

    /// Base armor after effects, never negative
    pub fn effective_armor(&self, base_armor: i32, config: &EffectConfig) -> i32 {
        base_armor
            .saturating_add(self.armor_adjustment(config))
            .max(0)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
