//! Dice rolling system
//!
//! Every draw goes through a [`DiceRoller`] owned by a combat session, so
//! separate sessions never share RNG state. Supports:
//! - single dice and summed pools ("3d6")
//! - aggregation modes (sum, take highest, take lowest, average)
//! - dice notation like "2d6+3", "d20", "4d6-2"

use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sides on the primary action die
pub const D20: u32 = 20;

/// Largest die a roll can report as an `i32`
const MAX_SIDES: u32 = i32::MAX as u32;

fn check_sides(sides: u32) -> Result<(), DiceError> {
    if sides == 0 {
        return Err(DiceError::InvalidArgument("die must have at least 1 side"));
    }
    if sides > MAX_SIDES {
        return Err(DiceError::InvalidArgument("die sides exceed i32 range"));
    }
    Ok(())
}

/// A pool is valid when its largest possible sum fits in an `i32`
fn check_pool(count: u32, sides: u32) -> Result<(), DiceError> {
    if count == 0 {
        return Err(DiceError::InvalidArgument("dice count must be at least 1"));
    }
    check_sides(sides)?;
    if count as u64 * sides as u64 > i32::MAX as u64 {
        return Err(DiceError::InvalidArgument("dice pool total exceeds i32 range"));
    }
    Ok(())
}

fn saturate(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

/// Errors raised at the dice boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("invalid dice argument: {0}")]
    InvalidArgument(&'static str),

    #[error("invalid dice notation: {0}")]
    InvalidNotation(String),
}

/// How a pool of dice is reduced to a single value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiceMode {
    /// Add every die together
    #[default]
    Sum,
    /// Keep only the highest die
    TakeHighest,
    /// Keep only the lowest die
    TakeLowest,
    /// Arithmetic mean, rounded half away from zero
    TakeAverage,
}

impl FromStr for DiceMode {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sum" => Ok(DiceMode::Sum),
            "highest" | "take_highest" | "high" => Ok(DiceMode::TakeHighest),
            "lowest" | "take_lowest" | "low" => Ok(DiceMode::TakeLowest),
            "average" | "take_average" | "avg" => Ok(DiceMode::TakeAverage),
            other => Err(DiceError::InvalidNotation(format!(
                "unknown dice mode: {}",
                other
            ))),
        }
    }
}

/// Source of random draws for one combat session
#[derive(Debug, Clone)]
pub struct DiceRoller {
    rng: StdRng,
}

impl DiceRoller {
    /// Deterministic roller, same seed gives the same sequence
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Roller seeded from the operating system
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Build from an optional seed (configuration helper)
    pub fn with_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// Roll one die: uniform in `1..=sides`
    pub fn roll(&mut self, sides: u32) -> Result<i32, DiceError> {
        check_sides(sides)?;
        Ok(self.rng.random_range(1..=sides) as i32)
    }

    /// Roll a d20 (always valid)
    pub fn roll_d20(&mut self) -> i32 {
        self.rng.random_range(1..=D20) as i32
    }

    /// Roll `count` dice and return their sum
    pub fn roll_many(&mut self, count: u32, sides: u32) -> Result<i32, DiceError> {
        self.roll_multiple(count, sides, DiceMode::Sum)
    }

    /// Roll `count` dice and return each individual result
    ///
    /// Rejects pools whose largest possible sum would not fit in an `i32`.
    pub fn roll_each(&mut self, count: u32, sides: u32) -> Result<Vec<i32>, DiceError> {
        check_pool(count, sides)?;

        let mut results = Vec::with_capacity(count as usize);
        for _ in 0..count {
            results.push(self.rng.random_range(1..=sides) as i32);
        }
        Ok(results)
    }

    /// Roll `count` dice and reduce them with `mode`
    pub fn roll_multiple(
        &mut self,
        count: u32,
        sides: u32,
        mode: DiceMode,
    ) -> Result<i32, DiceError> {
        let results = self.roll_each(count, sides)?;
        Ok(aggregate(&results, mode))
    }

    /// Draw a uniform value in `[0, 1)`
    pub fn chance(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Reduce individual die results with a selection mode
///
/// `results` must be non-empty; an empty slice yields 0. Sums saturate
/// at the `i32` bounds.
pub fn aggregate(results: &[i32], mode: DiceMode) -> i32 {
    if results.is_empty() {
        return 0;
    }
    match mode {
        DiceMode::Sum => saturate(results.iter().map(|r| *r as i64).sum()),
        DiceMode::TakeHighest => results.iter().copied().max().unwrap_or(0),
        DiceMode::TakeLowest => results.iter().copied().min().unwrap_or(0),
        DiceMode::TakeAverage => {
            let sum: i64 = results.iter().map(|r| *r as i64).sum();
            (sum as f64 / results.len() as f64).round() as i32
        }
    }
}

/// A parsed dice roll specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    /// Number of dice to roll
    pub count: u32,
    /// Number of sides per die
    pub sides: u32,
    /// Modifier to add/subtract after aggregation
    pub modifier: i32,
}

impl DiceRoll {
    pub fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            count,
            sides,
            modifier,
        }
    }

    /// Roll with the given aggregation mode and apply the modifier
    pub fn roll_with(&self, dice: &mut DiceRoller, mode: DiceMode) -> Result<i32, DiceError> {
        Ok(dice
            .roll_multiple(self.count, self.sides, mode)?
            .saturating_add(self.modifier))
    }

    /// Roll and return individual die results plus the summed total
    pub fn roll_detailed(&self, dice: &mut DiceRoller) -> Result<(Vec<i32>, i32), DiceError> {
        let results = dice.roll_each(self.count, self.sides)?;
        let total = aggregate(&results, DiceMode::Sum).saturating_add(self.modifier);
        Ok((results, total))
    }

    /// Get the minimum possible summed result
    pub fn min(&self) -> i32 {
        saturate(self.count as i64 + self.modifier as i64)
    }

    /// Get the maximum possible summed result
    pub fn max(&self) -> i32 {
        let top = (self.count as i64).saturating_mul(self.sides as i64);
        saturate(top.saturating_add(self.modifier as i64))
    }
}

impl FromStr for DiceRoll {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_dice(s)
    }
}

impl std::fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.modifier > 0 {
            write!(f, "{}d{}+{}", self.count, self.sides, self.modifier)
        } else if self.modifier < 0 {
            write!(f, "{}d{}{}", self.count, self.sides, self.modifier)
        } else {
            write!(f, "{}d{}", self.count, self.sides)
        }
    }
}

/// Parse a dice notation string like "2d6+3"
pub fn parse_dice(notation: &str) -> Result<DiceRoll, DiceError> {
    let notation = notation.trim().to_lowercase();
    let invalid = |msg: String| DiceError::InvalidNotation(msg);

    let d_pos = notation
        .find('d')
        .ok_or_else(|| invalid(format!("missing 'd' in {:?}", notation)))?;

    let count_str = &notation[..d_pos];
    let count: u32 = if count_str.is_empty() {
        1
    } else {
        count_str
            .parse()
            .map_err(|_| invalid(format!("bad dice count: {}", count_str)))?
    };
    if count == 0 {
        return Err(invalid("dice count must be at least 1".to_string()));
    }

    let rest = &notation[d_pos + 1..];
    let (sides_str, modifier) = if let Some(plus_pos) = rest.find('+') {
        let mod_str = &rest[plus_pos + 1..];
        let modifier: i32 = mod_str
            .parse()
            .map_err(|_| invalid(format!("bad modifier: {}", mod_str)))?;
        (&rest[..plus_pos], modifier)
    } else if let Some(minus_pos) = rest.rfind('-').filter(|pos| *pos > 0) {
        let mod_str = &rest[minus_pos..];
        let modifier: i32 = mod_str
            .parse()
            .map_err(|_| invalid(format!("bad modifier: {}", mod_str)))?;
        (&rest[..minus_pos], modifier)
    } else {
        (rest, 0)
    };

    let sides: u32 = sides_str
        .parse()
        .map_err(|_| invalid(format!("bad die sides: {}", sides_str)))?;
    if sides == 0 {
        return Err(invalid("die sides must be at least 1".to_string()));
    }

    Ok(DiceRoll::new(count, sides, modifier))
}
