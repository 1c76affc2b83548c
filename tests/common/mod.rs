//! Common test utilities - Arena harness for resolution tests

#![allow(dead_code)]

use std::sync::Arc;

use combo_engine::combat::{
    Action, ActionId, Actor, CombatEvent, CombatEventType, CombatSession, ResolveRequest,
    Resolution, ThresholdHitCheck,
};
use parking_lot::Mutex;

/// A seeded session with an attacker, a target and an event recorder
pub struct Arena {
    pub session: CombatSession,
    pub attacker: Actor,
    pub target: Actor,
    pub recorded: Arc<Mutex<Vec<CombatEvent>>>,
}

impl Arena {
    /// Arena whose attacker has a combo of the given action names
    pub fn with_combo(names: &[&str]) -> Self {
        let session = CombatSession::seeded(7);
        let mut attacker = Actor::new("Attacker");
        for name in names {
            let id = attacker.learn(Action::new(*name).combo());
            attacker
                .add_to_combo(id)
                .expect("combo action should be accepted");
        }

        let recorded = Arc::new(Mutex::new(Vec::new()));
        let bus = session.bus();
        for event_type in [
            CombatEventType::ActionExecuted,
            CombatEventType::ActionHit,
            CombatEventType::ActionMiss,
            CombatEventType::EffectApplied,
        ] {
            let recorded = Arc::clone(&recorded);
            bus.subscribe(event_type, move |event| {
                recorded.lock().push(event.clone());
                Ok(())
            });
        }

        Self {
            session,
            attacker,
            target: Actor::new("Target"),
            recorded,
        }
    }

    pub fn new() -> Self {
        Self::with_combo(&[])
    }

    /// Resolve a fixed natural roll with a bonus using the default hit check
    pub fn strike(&mut self, base: i32, bonus: i32) -> Resolution {
        self.strike_with(ResolveRequest::with_bonus(bonus), base)
    }

    /// Resolve a fixed natural roll with a specific action
    pub fn strike_action(&mut self, action: ActionId, base: i32) -> Resolution {
        self.strike_with(ResolveRequest::default().action(action), base)
    }

    fn strike_with(&mut self, request: ResolveRequest, base: i32) -> Resolution {
        self.session
            .resolve_with_base(
                &mut self.attacker,
                Some(&mut self.target),
                request,
                base,
                &ThresholdHitCheck,
            )
            .expect("resolution should succeed")
    }

    /// Names of the recorded event types, in delivery order
    pub fn recorded_types(&self) -> Vec<CombatEventType> {
        self.recorded.lock().iter().map(|e| e.event_type).collect()
    }

    pub fn current_combo_name(&self) -> Option<String> {
        self.attacker.combo().current().map(|a| a.name.clone())
    }
}
