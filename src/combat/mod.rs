//! Combat roll resolution
//!
//! Turns d20 rolls into categorized outcomes and drives the state that
//! depends on them:
//! - Dice rolling and notation (e.g., "2d6+3")
//! - Per-actor thresholds and roll modifier chains
//! - Categorization into miss / hit / combo / critical
//! - Combo sequences that advance on combo-grade rolls
//! - Conditional triggers and stacking status effects
//! - A synchronous event bus for everything above

mod actor;
mod categorize;
mod combo;
mod dice;
mod effects;
mod events;
mod modifiers;
mod session;
mod thresholds;
mod triggers;

pub use actor::{Action, ActionId, Actor, ActorId};
pub use categorize::{
    categorize, categorize_modified, DefenseHitCheck, HitCheck, RollCategory, RollOutcome,
    ThresholdHitCheck,
};
pub use combo::{ComboError, ComboSequence, ComboTransition};
pub use dice::{aggregate, parse_dice, DiceError, DiceMode, DiceRoll, DiceRoller, D20};
pub use effects::{EffectChange, EffectConfig, EffectKind, EffectStacks, FlagKind, StackKind};
pub use events::{CombatEvent, CombatEventType, EventBus, EventHandler, PublishReport};
pub use modifiers::{
    apply_chain, RollContext, RollModificationManager, RollModifier, DEFAULT_MAX_EXPLOSIONS,
};
pub use session::{AppliedEffect, CombatSession, Resolution, ResolveError, ResolveRequest};
pub use thresholds::{ThresholdError, ThresholdKind, ThresholdManager, ThresholdSet};
pub use triggers::{evaluate_conditions, ConditionalTrigger, TriggerCondition, TriggerRecipient};
