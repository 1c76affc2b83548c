//! Engine configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file,
//! then `COMBO_`-prefixed environment variables using `__` between
//! sections (`COMBO_THRESHOLDS__COMBO=15`, `COMBO_DICE__SEED=7`).

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::combat::{EffectConfig, ThresholdSet, DEFAULT_MAX_EXPLOSIONS};

/// Environment prefix for overrides
pub const ENV_PREFIX: &str = "COMBO_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    Figment(#[from] figment::Error),
}

/// Dice settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiceConfig {
    /// Fixed RNG seed; entropy when unset
    pub seed: Option<u64>,
    pub max_explosions: u32,
}

impl Default for DiceConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_explosions: DEFAULT_MAX_EXPLOSIONS,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Defaults for actors without explicit thresholds
    pub thresholds: ThresholdSet,
    pub effects: EffectConfig,
    pub dice: DiceConfig,
}

impl EngineConfig {
    /// Load defaults, then `path` if given, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Toml::file(path));
        }

        let config: EngineConfig = figment.merge(Env::prefixed(prefix).split("__")).extract()?;

        if let Err(e) = config.thresholds.validate() {
            warn!("configured thresholds are inconsistent: {}", e);
        }
        Ok(config)
    }
}
