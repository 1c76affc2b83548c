//! combo-engine - combat roll resolution and combo core
//!
//! Turns raw d20 rolls into categorized outcomes, cycles per-actor combo
//! sequences, fires conditional triggers and tracks stacking status effects.
//! Rendering, persistence and turn orchestration live with the caller.

pub mod combat;
pub mod config;

pub use combat::{Actor, CombatSession, ResolveRequest};
pub use config::{ConfigError, EngineConfig};
