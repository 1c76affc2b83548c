//! Roll categorization
//!
//! Turns a natural roll plus an integer bonus into one of six categories.
//! Critical misses look only at the natural roll; everything else looks at
//! the attack roll (modified roll + bonus). A natural 1 never lands.

use serde::{Deserialize, Serialize};

use super::thresholds::ThresholdSet;

/// Outcome category of a single roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollCategory {
    CriticalMiss,
    Miss,
    Hit,
    ComboAction,
    CriticalHit,
    CriticalHitCombo,
}

impl RollCategory {
    pub fn all() -> &'static [RollCategory] {
        &[
            RollCategory::CriticalMiss,
            RollCategory::Miss,
            RollCategory::Hit,
            RollCategory::ComboAction,
            RollCategory::CriticalHit,
            RollCategory::CriticalHitCombo,
        ]
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, RollCategory::CriticalMiss | RollCategory::Miss)
    }

    pub fn is_combo(&self) -> bool {
        matches!(self, RollCategory::ComboAction | RollCategory::CriticalHitCombo)
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, RollCategory::CriticalHit | RollCategory::CriticalHitCombo)
    }
}

impl std::fmt::Display for RollCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RollCategory::CriticalMiss => "critical miss",
            RollCategory::Miss => "miss",
            RollCategory::Hit => "hit",
            RollCategory::ComboAction => "combo",
            RollCategory::CriticalHit => "critical hit",
            RollCategory::CriticalHitCombo => "critical combo",
        };
        write!(f, "{}", s)
    }
}

/// Result of categorizing one roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOutcome {
    /// Natural roll before modifiers and bonus
    pub base: i32,
    /// Modified roll plus bonus
    pub attack: i32,
    pub category: RollCategory,
    pub is_miss: bool,
    pub is_combo: bool,
    pub is_critical: bool,
}

/// Decides whether an attack roll lands
pub trait HitCheck {
    fn hits(&self, attack_roll: i32, thresholds: &ThresholdSet) -> bool;
}

/// Attack roll must reach the actor's hit threshold
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdHitCheck;

impl HitCheck for ThresholdHitCheck {
    fn hits(&self, attack_roll: i32, thresholds: &ThresholdSet) -> bool {
        attack_roll >= thresholds.hit
    }
}

/// Attack roll must reach a defense value computed by the caller
/// (typically target armor plus half agility)
#[derive(Debug, Clone, Copy)]
pub struct DefenseHitCheck {
    pub defense: i32,
}

impl HitCheck for DefenseHitCheck {
    fn hits(&self, attack_roll: i32, _thresholds: &ThresholdSet) -> bool {
        attack_roll >= self.defense
    }
}

/// Categorize an unmodified roll
pub fn categorize(
    thresholds: &ThresholdSet,
    base_roll: i32,
    roll_bonus: i32,
    hit: &dyn HitCheck,
) -> RollOutcome {
    categorize_modified(thresholds, base_roll, base_roll, roll_bonus, hit)
}

/// Categorize a roll that went through the modifier chain
pub fn categorize_modified(
    thresholds: &ThresholdSet,
    natural_roll: i32,
    modified_roll: i32,
    roll_bonus: i32,
    hit: &dyn HitCheck,
) -> RollOutcome {
    let attack = modified_roll.saturating_add(roll_bonus);

    let category = if natural_roll <= thresholds.critical_miss {
        RollCategory::CriticalMiss
    } else if natural_roll == 1 || !hit.hits(attack, thresholds) {
        RollCategory::Miss
    } else {
        let is_combo = attack >= thresholds.combo;
        let is_critical = attack >= thresholds.critical_hit;
        match (is_critical, is_combo) {
            (true, true) => RollCategory::CriticalHitCombo,
            (true, false) => RollCategory::CriticalHit,
            (false, true) => RollCategory::ComboAction,
            (false, false) => RollCategory::Hit,
        }
    };

    RollOutcome {
        base: natural_roll,
        attack,
        category,
        is_miss: category.is_miss(),
        is_combo: category.is_combo(),
        is_critical: category.is_critical(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(thresholds: &ThresholdSet, base: i32, bonus: i32) -> RollCategory {
        categorize(thresholds, base, bonus, &ThresholdHitCheck).category
    }

    #[test]
    fn test_default_partition() {
        let t = ThresholdSet::default();
        assert_eq!(cat(&t, 1, 0), RollCategory::CriticalMiss);
        for base in 2..=5 {
            assert_eq!(cat(&t, base, 0), RollCategory::Miss, "base {}", base);
        }
        for base in 6..=13 {
            assert_eq!(cat(&t, base, 0), RollCategory::Hit, "base {}", base);
        }
        for base in 14..=19 {
            assert_eq!(cat(&t, base, 0), RollCategory::ComboAction, "base {}", base);
        }
        assert_eq!(cat(&t, 20, 0), RollCategory::CriticalHitCombo);
    }

    #[test]
    fn test_natural_one_never_lands() {
        let t = ThresholdSet::default();
        for bonus in 0..=100 {
            let outcome = categorize(&t, 1, bonus, &ThresholdHitCheck);
            assert!(outcome.is_miss);
            assert_eq!(outcome.category, RollCategory::CriticalMiss);
        }

        // With the critical miss threshold at 0, a natural 1 is still a miss
        let lowered = ThresholdSet {
            critical_miss: 0,
            ..ThresholdSet::default()
        };
        assert_eq!(cat(&lowered, 1, 50), RollCategory::Miss);
    }

    #[test]
    fn test_raised_critical_miss() {
        let t = ThresholdSet {
            critical_miss: 2,
            ..ThresholdSet::default()
        };
        assert_eq!(cat(&t, 2, 0), RollCategory::CriticalMiss);
        assert_eq!(cat(&t, 2, 30), RollCategory::CriticalMiss);
        assert_eq!(cat(&t, 3, 0), RollCategory::Miss);
    }

    #[test]
    fn test_lowered_critical_hit() {
        let t = ThresholdSet {
            critical_hit: 18,
            ..ThresholdSet::default()
        };
        assert_eq!(cat(&t, 18, 0), RollCategory::CriticalHitCombo);
        assert_eq!(cat(&t, 17, 0), RollCategory::ComboAction);
    }

    #[test]
    fn test_bonus_pushes_into_higher_categories() {
        let t = ThresholdSet::default();
        assert_eq!(cat(&t, 15, 5), RollCategory::CriticalHitCombo);
        assert_eq!(cat(&t, 10, 10), RollCategory::CriticalHitCombo);
        assert_eq!(cat(&t, 10, 4), RollCategory::ComboAction);
        assert_eq!(cat(&t, 4, 2), RollCategory::Hit);
    }

    #[test]
    fn test_critical_without_combo() {
        // Crit threshold below combo threshold
        let t = ThresholdSet {
            combo: 18,
            critical_hit: 16,
            ..ThresholdSet::default()
        };
        assert_eq!(cat(&t, 17, 0), RollCategory::CriticalHit);
        assert_eq!(cat(&t, 18, 0), RollCategory::CriticalHitCombo);
    }

    #[test]
    fn test_bonus_monotonic() {
        let t = ThresholdSet::default();
        let rank = |c: RollCategory| match c {
            RollCategory::CriticalMiss | RollCategory::Miss => 0,
            RollCategory::Hit => 1,
            RollCategory::ComboAction | RollCategory::CriticalHit => 2,
            RollCategory::CriticalHitCombo => 3,
        };
        for base in 2..=20 {
            let mut previous = 0;
            for bonus in 0..=20 {
                let outcome = categorize(&t, base, bonus, &ThresholdHitCheck);
                if outcome.is_miss {
                    continue;
                }
                let r = rank(outcome.category);
                assert!(r >= previous, "base {} bonus {}", base, bonus);
                previous = r;
            }
        }
    }

    #[test]
    fn test_defense_hit_check() {
        let t = ThresholdSet::default();
        let check = DefenseHitCheck { defense: 12 };
        assert_eq!(categorize(&t, 11, 0, &check).category, RollCategory::Miss);
        assert_eq!(categorize(&t, 12, 0, &check).category, RollCategory::Hit);
        assert_eq!(categorize(&t, 1, 30, &check).category, RollCategory::CriticalMiss);
    }

    #[test]
    fn test_modified_roll_drives_attack() {
        let t = ThresholdSet::default();
        // Natural 3 boosted to 14: combo, and not a critical miss
        let outcome = categorize_modified(&t, 3, 14, 0, &ThresholdHitCheck);
        assert_eq!(outcome.category, RollCategory::ComboAction);
        assert_eq!(outcome.base, 3);
        assert_eq!(outcome.attack, 14);

        // Natural 1 stays a critical miss however large the modified roll
        let outcome = categorize_modified(&t, 1, 40, 0, &ThresholdHitCheck);
        assert_eq!(outcome.category, RollCategory::CriticalMiss);
    }

    #[test]
    fn test_outcome_flags_match_category() {
        let t = ThresholdSet::default();
        for base in 1..=20 {
            let o = categorize(&t, base, 0, &ThresholdHitCheck);
            assert_eq!(o.is_miss, o.category.is_miss());
            assert_eq!(o.is_combo, o.category.is_combo());
            assert_eq!(o.is_critical, o.category.is_critical());
        }
    }
}
