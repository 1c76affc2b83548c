//! Conditional triggers
//!
//! A trigger pairs a list of conditions with an effect. Conditions read only
//! the flags already stored on a [`CombatEvent`]; categorization is never
//! recomputed here. All conditions must match (AND), and an empty list
//! always matches.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::categorize::RollCategory;
use super::effects::EffectKind;
use super::events::CombatEvent;

/// A predicate over a categorized event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerCondition {
    OnMiss,
    OnCriticalMiss,
    OnHit,
    /// Landed without a crit
    OnNormalHit,
    OnCriticalHit,
    OnComboHit,
    /// A condition name that failed to parse; never matches
    Unrecognized,
}

impl TriggerCondition {
    pub fn matches(&self, event: &CombatEvent) -> bool {
        match self {
            TriggerCondition::OnMiss => event.is_miss,
            TriggerCondition::OnCriticalMiss => {
                event.is_miss && event.category == Some(RollCategory::CriticalMiss)
            }
            TriggerCondition::OnHit => !event.is_miss,
            TriggerCondition::OnNormalHit => !event.is_miss && !event.is_critical,
            TriggerCondition::OnCriticalHit => !event.is_miss && event.is_critical,
            TriggerCondition::OnComboHit => !event.is_miss && event.is_combo,
            TriggerCondition::Unrecognized => false,
        }
    }

    /// Parse a condition name, mapping unknown names to `Unrecognized`
    pub fn parse_lenient(name: &str) -> Self {
        match name.parse() {
            Ok(condition) => condition,
            Err(_) => {
                warn!(condition = name, "unrecognized trigger condition");
                TriggerCondition::Unrecognized
            }
        }
    }
}

impl FromStr for TriggerCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "onmiss" => Ok(TriggerCondition::OnMiss),
            "oncriticalmiss" => Ok(TriggerCondition::OnCriticalMiss),
            "onhit" => Ok(TriggerCondition::OnHit),
            "onnormalhit" => Ok(TriggerCondition::OnNormalHit),
            "oncriticalhit" => Ok(TriggerCondition::OnCriticalHit),
            "oncombohit" => Ok(TriggerCondition::OnComboHit),
            _ => Err(format!("unknown trigger condition: {}", s)),
        }
    }
}

impl std::fmt::Display for TriggerCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TriggerCondition::OnMiss => "OnMiss",
            TriggerCondition::OnCriticalMiss => "OnCriticalMiss",
            TriggerCondition::OnHit => "OnHit",
            TriggerCondition::OnNormalHit => "OnNormalHit",
            TriggerCondition::OnCriticalHit => "OnCriticalHit",
            TriggerCondition::OnComboHit => "OnComboHit",
            TriggerCondition::Unrecognized => "Unrecognized",
        };
        write!(f, "{}", s)
    }
}

/// True when every condition matches the event
pub fn evaluate_conditions(conditions: &[TriggerCondition], event: &CombatEvent) -> bool {
    conditions.iter().all(|c| c.matches(event))
}

/// Who receives a trigger's effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerRecipient {
    /// The acting actor
    #[default]
    Source,
    /// The action's target
    Target,
}

/// An effect applied when its conditions hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalTrigger {
    pub conditions: Vec<TriggerCondition>,
    pub effect: EffectKind,
    #[serde(default)]
    pub recipient: TriggerRecipient,
}

impl ConditionalTrigger {
    pub fn new(conditions: Vec<TriggerCondition>, effect: EffectKind) -> Self {
        Self {
            conditions,
            effect,
            recipient: TriggerRecipient::Source,
        }
    }

    pub fn on_target(mut self) -> Self {
        self.recipient = TriggerRecipient::Target;
        self
    }

    /// Build from condition names, warning on any that do not parse
    pub fn from_names(names: &[&str], effect: EffectKind) -> Self {
        let conditions = names
            .iter()
            .map(|n| TriggerCondition::parse_lenient(n))
            .collect();
        Self::new(conditions, effect)
    }

    pub fn fires(&self, event: &CombatEvent) -> bool {
        evaluate_conditions(&self.conditions, event)
    }
}
