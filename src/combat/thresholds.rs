//! Per-actor roll thresholds
//!
//! Four integer thresholds drive categorization: critical miss, hit, combo
//! and critical hit. Actors without an explicit entry use the defaults the
//! manager was built with.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::actor::ActorId;

/// Which threshold a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    CriticalMiss,
    Hit,
    Combo,
    CriticalHit,
}

impl ThresholdKind {
    pub fn all() -> &'static [ThresholdKind] {
        &[
            ThresholdKind::CriticalMiss,
            ThresholdKind::Hit,
            ThresholdKind::Combo,
            ThresholdKind::CriticalHit,
        ]
    }
}

impl std::fmt::Display for ThresholdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ThresholdKind::CriticalMiss => "critical_miss",
            ThresholdKind::Hit => "hit",
            ThresholdKind::Combo => "combo",
            ThresholdKind::CriticalHit => "critical_hit",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThresholdError {
    #[error("thresholds out of order: {lower} ({lower_value}) must be below {upper} ({upper_value})")]
    OutOfOrder {
        lower: ThresholdKind,
        lower_value: i32,
        upper: ThresholdKind,
        upper_value: i32,
    },
}

/// A complete set of thresholds for one actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdSet {
    /// Natural rolls at or below this are critical misses
    pub critical_miss: i32,
    /// Minimum attack roll that lands
    pub hit: i32,
    /// Minimum attack roll that advances the combo
    pub combo: i32,
    /// Minimum attack roll that crits
    pub critical_hit: i32,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            critical_miss: 1,
            hit: 6,
            combo: 14,
            critical_hit: 20,
        }
    }
}

impl ThresholdSet {
    pub fn get(&self, kind: ThresholdKind) -> i32 {
        match kind {
            ThresholdKind::CriticalMiss => self.critical_miss,
            ThresholdKind::Hit => self.hit,
            ThresholdKind::Combo => self.combo,
            ThresholdKind::CriticalHit => self.critical_hit,
        }
    }

    pub fn set(&mut self, kind: ThresholdKind, value: i32) {
        match kind {
            ThresholdKind::CriticalMiss => self.critical_miss = value,
            ThresholdKind::Hit => self.hit = value,
            ThresholdKind::Combo => self.combo = value,
            ThresholdKind::CriticalHit => self.critical_hit = value,
        }
    }

    /// Check critical_miss < hit <= combo <= critical_hit
    pub fn validate(&self) -> Result<(), ThresholdError> {
        let out_of_order = |lower: ThresholdKind, upper: ThresholdKind| ThresholdError::OutOfOrder {
            lower,
            lower_value: self.get(lower),
            upper,
            upper_value: self.get(upper),
        };

        if self.critical_miss >= self.hit {
            return Err(out_of_order(ThresholdKind::CriticalMiss, ThresholdKind::Hit));
        }
        if self.hit > self.combo {
            return Err(out_of_order(ThresholdKind::Hit, ThresholdKind::Combo));
        }
        if self.combo > self.critical_hit {
            return Err(out_of_order(ThresholdKind::Combo, ThresholdKind::CriticalHit));
        }
        Ok(())
    }
}

/// Threshold storage for every actor in a session
#[derive(Debug, Clone, Default)]
pub struct ThresholdManager {
    defaults: ThresholdSet,
    overrides: HashMap<ActorId, ThresholdSet>,
}

impl ThresholdManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager whose unset actors fall back to `defaults`
    pub fn with_defaults(defaults: ThresholdSet) -> Self {
        if let Err(e) = defaults.validate() {
            warn!("default thresholds are inconsistent: {}", e);
        }
        Self {
            defaults,
            overrides: HashMap::new(),
        }
    }

    pub fn defaults(&self) -> ThresholdSet {
        self.defaults
    }

    /// Thresholds in effect for an actor
    pub fn get(&self, actor: ActorId) -> ThresholdSet {
        self.overrides.get(&actor).copied().unwrap_or(self.defaults)
    }

    pub fn threshold(&self, actor: ActorId, kind: ThresholdKind) -> i32 {
        self.get(actor).get(kind)
    }

    /// Store a raw value; ordering is not enforced
    pub fn set_threshold(&mut self, actor: ActorId, kind: ThresholdKind, value: i32) {
        let defaults = self.defaults;
        let set = self.overrides.entry(actor).or_insert(defaults);
        set.set(kind, value);
        debug!(actor = %actor, %kind, value, "threshold set");

        if let Err(e) = set.validate() {
            warn!(actor = %actor, "threshold ordering broken: {}", e);
        }
    }

    /// Store a value only if the resulting set stays ordered
    pub fn try_set_threshold(
        &mut self,
        actor: ActorId,
        kind: ThresholdKind,
        value: i32,
    ) -> Result<(), ThresholdError> {
        let mut candidate = self.get(actor);
        candidate.set(kind, value);
        candidate.validate()?;
        self.overrides.insert(actor, candidate);
        Ok(())
    }

    /// Restore the defaults for one actor, leaving others untouched
    pub fn reset(&mut self, actor: ActorId) {
        if self.overrides.remove(&actor).is_some() {
            debug!(actor = %actor, "thresholds reset to defaults");
        }
    }

    /// Whether an actor has any explicit threshold
    pub fn has_override(&self, actor: ActorId) -> bool {
        self.overrides.contains_key(&actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let manager = ThresholdManager::new();
        let actor = ActorId::new();
        let set = manager.get(actor);

        assert_eq!(set.critical_miss, 1);
        assert_eq!(set.hit, 6);
        assert_eq!(set.combo, 14);
        assert_eq!(set.critical_hit, 20);
        assert!(set.validate().is_ok());
    }

    #[test]
    fn test_set_and_get() {
        let mut manager = ThresholdManager::new();
        let actor = ActorId::new();

        manager.set_threshold(actor, ThresholdKind::CriticalMiss, 2);
        manager.set_threshold(actor, ThresholdKind::Hit, 10);
        manager.set_threshold(actor, ThresholdKind::Combo, 15);
        manager.set_threshold(actor, ThresholdKind::CriticalHit, 18);

        assert_eq!(manager.threshold(actor, ThresholdKind::CriticalMiss), 2);
        assert_eq!(manager.threshold(actor, ThresholdKind::Hit), 10);
        assert_eq!(manager.threshold(actor, ThresholdKind::Combo), 15);
        assert_eq!(manager.threshold(actor, ThresholdKind::CriticalHit), 18);
    }

    #[test]
    fn test_actors_are_independent() {
        let mut manager = ThresholdManager::new();
        let first = ActorId::new();
        let second = ActorId::new();

        manager.set_threshold(first, ThresholdKind::CriticalHit, 18);
        manager.set_threshold(second, ThresholdKind::CriticalHit, 19);
        assert_eq!(manager.threshold(first, ThresholdKind::CriticalHit), 18);
        assert_eq!(manager.threshold(second, ThresholdKind::CriticalHit), 19);

        manager.reset(first);
        assert_eq!(manager.threshold(first, ThresholdKind::CriticalHit), 20);
        assert!(!manager.has_override(first));
        assert_eq!(manager.threshold(second, ThresholdKind::CriticalHit), 19);
    }

    #[test]
    fn test_last_write_wins() {
        let mut manager = ThresholdManager::new();
        let actor = ActorId::new();
        for value in [15, 16, 17] {
            manager.set_threshold(actor, ThresholdKind::CriticalHit, value);
        }
        assert_eq!(manager.threshold(actor, ThresholdKind::CriticalHit), 17);
    }

    #[test]
    fn test_raw_values_are_stored() {
        let mut manager = ThresholdManager::new();
        let actor = ActorId::new();

        // Crit below combo is allowed through the raw setter
        manager.set_threshold(actor, ThresholdKind::CriticalHit, 10);
        assert_eq!(manager.threshold(actor, ThresholdKind::CriticalHit), 10);
        assert!(manager.get(actor).validate().is_err());
    }

    #[test]
    fn test_try_set_rejects_out_of_order() {
        let mut manager = ThresholdManager::new();
        let actor = ActorId::new();

        let err = manager
            .try_set_threshold(actor, ThresholdKind::CriticalHit, 10)
            .unwrap_err();
        assert!(matches!(
            err,
            ThresholdError::OutOfOrder {
                lower: ThresholdKind::Combo,
                upper: ThresholdKind::CriticalHit,
                ..
            }
        ));
        assert_eq!(manager.threshold(actor, ThresholdKind::CriticalHit), 20);

        manager
            .try_set_threshold(actor, ThresholdKind::CriticalHit, 18)
            .unwrap();
        assert_eq!(manager.threshold(actor, ThresholdKind::CriticalHit), 18);
    }

    #[test]
    fn test_custom_defaults() {
        let defaults = ThresholdSet {
            critical_miss: 2,
            hit: 8,
            combo: 15,
            critical_hit: 19,
        };
        let mut manager = ThresholdManager::with_defaults(defaults);
        let actor = ActorId::new();

        manager.set_threshold(actor, ThresholdKind::Hit, 9);
        manager.reset(actor);
        assert_eq!(manager.get(actor), defaults);
    }
}
