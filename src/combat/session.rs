//! Single-roll resolution
//!
//! A [`CombatSession`] owns the services one fight needs (dice, thresholds,
//! modifier chains, event bus) and runs one resolution step at a time:
//! select action, roll, modify, categorize, publish, advance the combo,
//! fire triggers.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use super::actor::{Action, ActionId, Actor};
use super::categorize::{categorize_modified, HitCheck, RollOutcome};
use super::combo::ComboTransition;
use super::dice::{DiceError, DiceRoller, D20};
use super::effects::{EffectChange, EffectConfig, EffectKind};
use super::events::{CombatEvent, CombatEventType, EventBus};
use super::modifiers::RollModificationManager;
use super::thresholds::ThresholdManager;
use super::triggers::TriggerRecipient;
use crate::config::EngineConfig;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("action {0} is not in the actor's pool")]
    UnknownAction(ActionId),

    #[error(transparent)]
    Dice(#[from] DiceError),
}

/// What the caller asks for on a turn
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveRequest {
    /// Explicit action; `None` uses the current combo action
    pub action: Option<ActionId>,
    /// Final integer bonus from stats and equipment
    pub roll_bonus: i32,
}

impl ResolveRequest {
    pub fn with_bonus(roll_bonus: i32) -> Self {
        Self {
            action: None,
            roll_bonus,
        }
    }

    pub fn action(mut self, action: ActionId) -> Self {
        self.action = Some(action);
        self
    }
}

/// An effect that a trigger applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedEffect {
    pub recipient: TriggerRecipient,
    pub effect: EffectKind,
    pub change: EffectChange,
}

/// Everything one resolution step produced
#[derive(Debug, Clone)]
pub struct Resolution {
    pub action: Option<ActionId>,
    /// Roll after the modifier chain, before the bonus
    pub modified_roll: i32,
    pub outcome: RollOutcome,
    /// Events in publish order
    pub events: Vec<CombatEvent>,
    pub transition: ComboTransition,
    pub applied_effects: Vec<AppliedEffect>,
}

/// Services for one fight
#[derive(Debug)]
pub struct CombatSession {
    pub dice: DiceRoller,
    pub thresholds: ThresholdManager,
    pub modifiers: RollModificationManager,
    pub effects: EffectConfig,
    bus: Arc<EventBus>,
}

impl CombatSession {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            dice: DiceRoller::with_seed(config.dice.seed),
            thresholds: ThresholdManager::with_defaults(config.thresholds),
            modifiers: RollModificationManager::new(config.dice.max_explosions),
            effects: config.effects.clone(),
            bus: Arc::new(EventBus::new()),
        }
    }

    /// Session with default tuning and a fixed seed
    pub fn seeded(seed: u64) -> Self {
        let mut config = EngineConfig::default();
        config.dice.seed = Some(seed);
        Self::new(&config)
    }

    /// Shared handle to the event bus
    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    /// Roll a d20 and resolve it
    pub fn resolve(
        &mut self,
        source: &mut Actor,
        target: Option<&mut Actor>,
        request: ResolveRequest,
        hit: &dyn HitCheck,
    ) -> Result<Resolution, ResolveError> {
        let action = select_action(source, request.action)?;
        let natural = self.dice.roll(D20)?;
        self.run(source, target, action, natural, request.roll_bonus, hit)
    }

    /// Resolve a caller-supplied natural roll
    pub fn resolve_with_base(
        &mut self,
        source: &mut Actor,
        target: Option<&mut Actor>,
        request: ResolveRequest,
        natural_roll: i32,
        hit: &dyn HitCheck,
    ) -> Result<Resolution, ResolveError> {
        let action = select_action(source, request.action)?;
        self.run(source, target, action, natural_roll, request.roll_bonus, hit)
    }

    fn run(
        &mut self,
        source: &mut Actor,
        mut target: Option<&mut Actor>,
        action: Option<Action>,
        natural: i32,
        roll_bonus: i32,
        hit: &dyn HitCheck,
    ) -> Result<Resolution, ResolveError> {
        let target_id = target.as_ref().map(|t| t.id);
        let action_id = action.as_ref().map(|a| a.id);

        let modified = self.modifiers.apply_action_roll_modifications(
            natural,
            action.as_ref(),
            source.id,
            target_id,
            &mut self.dice,
        );

        let thresholds = self.thresholds.get(source.id);
        let outcome = categorize_modified(&thresholds, natural, modified, roll_bonus, hit);
        debug!(
            actor = %source.name,
            action = action.as_ref().map(|a| a.name.as_str()).unwrap_or("attack"),
            natural,
            modified,
            roll_bonus,
            category = %outcome.category,
            "roll categorized"
        );

        let mut events = Vec::with_capacity(3);
        let executed = CombatEvent::from_outcome(
            CombatEventType::ActionExecuted,
            source.id,
            target_id,
            action_id,
            &outcome,
        );
        self.bus.publish(&executed);
        events.push(executed);

        let result_type = if outcome.is_miss {
            CombatEventType::ActionMiss
        } else {
            CombatEventType::ActionHit
        };
        let result_event =
            CombatEvent::from_outcome(result_type, source.id, target_id, action_id, &outcome);
        self.bus.publish(&result_event);
        events.push(result_event.clone());

        let transition = source.combo_mut().on_outcome(outcome.category);

        let mut applied_effects = Vec::new();
        if let Some(action) = &action {
            for trigger in action.triggers.iter().filter(|t| t.fires(&result_event)) {
                let recipient = match (trigger.recipient, target.as_deref_mut()) {
                    (TriggerRecipient::Source, _) => &mut *source,
                    (TriggerRecipient::Target, Some(t)) => t,
                    (TriggerRecipient::Target, None) => {
                        debug!(effect = %trigger.effect, "trigger has no target, skipped");
                        continue;
                    }
                };

                let change = recipient.apply_effect(trigger.effect, &self.effects);
                let recipient_id = recipient.id;
                let applied = CombatEvent::from_outcome(
                    CombatEventType::EffectApplied,
                    source.id,
                    Some(recipient_id),
                    action_id,
                    &outcome,
                )
                .with_effect(trigger.effect);
                self.bus.publish(&applied);
                events.push(applied);

                applied_effects.push(AppliedEffect {
                    recipient: trigger.recipient,
                    effect: trigger.effect,
                    change,
                });
            }
        }

        let wrapped = matches!(transition, ComboTransition::Advanced { wrapped: true, .. });
        if outcome.category.is_critical() || wrapped {
            info!(actor = %source.name, category = %outcome.category, ?transition, "notable roll");
        }

        Ok(Resolution {
            action: action_id,
            modified_roll: modified,
            outcome,
            events,
            transition,
            applied_effects,
        })
    }
}

/// Requested action from the pool, or the current combo action
fn select_action(source: &Actor, requested: Option<ActionId>) -> Result<Option<Action>, ResolveError> {
    match requested {
        Some(id) => source
            .action(id)
            .cloned()
            .map(Some)
            .ok_or(ResolveError::UnknownAction(id)),
        None => Ok(source.combo().current().cloned()),
    }
}
