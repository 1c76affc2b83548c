//! Combat event bus
//!
//! Handlers subscribe per event type and run synchronously on the
//! publishing thread, in registration order. A handler that errors or
//! panics is logged and skipped. Events published from inside a handler are queued and
//! delivered after the current fan-out, so handlers never nest.

use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use super::actor::{ActionId, ActorId};
use super::categorize::{RollCategory, RollOutcome};
use super::effects::EffectKind;

/// Kinds of combat event
///
/// Resolution publishes the first four. `ActorDefeated` and
/// `HealthThreshold` belong to the health layer that owns hit points; the
/// bus carries them for it but nothing in this crate emits them.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatEventType {
    ActionExecuted,
    ActionHit,
    ActionMiss,
    EffectApplied,
    /// An actor dropped to zero health
    ActorDefeated,
    /// An actor's health crossed a watched fraction
    HealthThreshold,
}

impl std::fmt::Display for CombatEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CombatEventType::ActionExecuted => "action_executed",
            CombatEventType::ActionHit => "action_hit",
            CombatEventType::ActionMiss => "action_miss",
            CombatEventType::EffectApplied => "effect_applied",
            CombatEventType::ActorDefeated => "actor_defeated",
            CombatEventType::HealthThreshold => "health_threshold",
        };
        write!(f, "{}", s)
    }
}

/// Snapshot of something that happened during resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatEvent {
    pub event_type: CombatEventType,
    pub source: ActorId,
    pub target: Option<ActorId>,
    pub action: Option<ActionId>,
    pub is_miss: bool,
    pub is_combo: bool,
    pub is_critical: bool,
    /// Attack roll the category was derived from
    pub roll_value: i32,
    pub category: Option<RollCategory>,
    /// Effect carried by `EffectApplied` events
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub effect: Option<EffectKind>,
}

impl CombatEvent {
    pub fn new(event_type: CombatEventType, source: ActorId) -> Self {
        Self {
            event_type,
            source,
            target: None,
            action: None,
            is_miss: false,
            is_combo: false,
            is_critical: false,
            roll_value: 0,
            category: None,
            effect: None,
        }
    }

    /// Event carrying the flags of a categorized roll
    pub fn from_outcome(
        event_type: CombatEventType,
        source: ActorId,
        target: Option<ActorId>,
        action: Option<ActionId>,
        outcome: &RollOutcome,
    ) -> Self {
        Self {
            target,
            action,
            is_miss: outcome.is_miss,
            is_combo: outcome.is_combo,
            is_critical: outcome.is_critical,
            roll_value: outcome.attack,
            category: Some(outcome.category),
            ..Self::new(event_type, source)
        }
    }

    pub fn with_target(mut self, target: ActorId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_action(mut self, action: ActionId) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_category(mut self, category: RollCategory, roll_value: i32) -> Self {
        self.category = Some(category);
        self.roll_value = roll_value;
        self.is_miss = category.is_miss();
        self.is_combo = category.is_combo();
        self.is_critical = category.is_critical();
        self
    }

    pub fn with_effect(mut self, effect: EffectKind) -> Self {
        self.effect = Some(effect);
        self
    }
}

/// Subscriber callback
pub type EventHandler = Box<dyn FnMut(&CombatEvent) -> anyhow::Result<()> + Send>;

/// Delivery counts for one publish call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Handlers that returned Ok
    pub delivered: usize,
    /// Handlers that returned Err or panicked
    pub failed: usize,
    /// Published from inside a handler and deferred to the outer fan-out
    pub queued: bool,
}

impl std::ops::AddAssign for PublishReport {
    fn add_assign(&mut self, other: Self) {
        self.delivered += other.delivered;
        self.failed += other.failed;
    }
}

/// Synchronous per-type event bus
#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<HashMap<CombatEventType, Vec<EventHandler>>>,
    pending: Mutex<VecDeque<CombatEvent>>,
    dispatching: AtomicBool,
    /// Bumped by `clear` so handlers taken out for a fan-out are not restored
    generation: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event type
    pub fn subscribe<F>(&self, event_type: CombatEventType, handler: F)
    where
        F: FnMut(&CombatEvent) -> anyhow::Result<()> + Send + 'static,
    {
        self.handlers
            .lock()
            .entry(event_type)
            .or_default()
            .push(Box::new(handler));
    }

    /// Deliver an event to every handler of its type
    ///
    /// The report covers this event and anything handlers queued while it
    /// was being delivered. A call made from inside a handler returns an
    /// empty report with `queued` set.
    pub fn publish(&self, event: &CombatEvent) -> PublishReport {
        self.pending.lock().push_back(event.clone());

        if self.dispatching.swap(true, Ordering::AcqRel) {
            trace!(event_type = %event.event_type, "event queued behind running fan-out");
            return PublishReport {
                queued: true,
                ..PublishReport::default()
            };
        }

        let mut report = PublishReport::default();
        loop {
            loop {
                let next = self.pending.lock().pop_front();
                match next {
                    Some(event) => report += self.dispatch(&event),
                    None => break,
                }
            }
            self.dispatching.store(false, Ordering::Release);

            // Another thread may have queued between the last pop and the store
            if self.pending.lock().is_empty() || self.dispatching.swap(true, Ordering::AcqRel) {
                break;
            }
        }
        report
    }

    fn dispatch(&self, event: &CombatEvent) -> PublishReport {
        let generation = self.generation.load(Ordering::Acquire);
        let mut handlers = self
            .handlers
            .lock()
            .remove(&event.event_type)
            .unwrap_or_default();

        let mut report = PublishReport::default();
        for (index, handler) in handlers.iter_mut().enumerate() {
            // A panic must not leave the bus mid fan-out with its handlers taken
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!(
                        event_type = %event.event_type,
                        handler = index,
                        "event handler failed: {:#}",
                        e
                    );
                }
                Err(payload) => {
                    report.failed += 1;
                    warn!(
                        event_type = %event.event_type,
                        handler = index,
                        "event handler panicked: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }

        if self.generation.load(Ordering::Acquire) == generation {
            let mut map = self.handlers.lock();
            // Subscriptions made during the fan-out go after the existing ones
            let added = map.remove(&event.event_type).unwrap_or_default();
            handlers.extend(added);
            map.insert(event.event_type, handlers);
        }
        report
    }

    /// Remove every subscription
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.handlers.lock().clear();
    }

    pub fn subscriber_count(&self, event_type: CombatEventType) -> usize {
        self.handlers
            .lock()
            .get(&event_type)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<CombatEventType, usize> = self
            .handlers
            .lock()
            .iter()
            .map(|(k, v)| (*k, v.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("subscribers", &counts)
            .field("pending", &self.pending.lock().len())
            .finish()
    }
}
