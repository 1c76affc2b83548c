//! Actors and their actions
//!
//! An actor owns its action pool, its combo sequence and its effect
//! counters. Combo membership is tracked by action instance, so two actions
//! with the same name are still distinct.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::combo::{ComboError, ComboSequence};
use super::effects::{EffectChange, EffectConfig, EffectKind, EffectStacks};
use super::modifiers::RollModifier;
use super::triggers::ConditionalTrigger;

/// Unique actor identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique action instance identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(pub Uuid);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Something an actor can do on its turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub name: String,
    pub is_combo_action: bool,
    /// 1-based position in the owner's combo, 0 when not in one
    pub combo_order: u32,
    pub damage_multiplier: f64,
    /// Turns before the action can be used again
    pub cooldown: u32,
    pub roll_modifiers: Vec<RollModifier>,
    pub triggers: Vec<ConditionalTrigger>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ActionId::new(),
            name: name.into(),
            is_combo_action: false,
            combo_order: 0,
            damage_multiplier: 1.0,
            cooldown: 0,
            roll_modifiers: Vec::new(),
            triggers: Vec::new(),
        }
    }

    /// Mark as usable in a combo sequence
    pub fn combo(mut self) -> Self {
        self.is_combo_action = true;
        self
    }

    pub fn with_damage_multiplier(mut self, multiplier: f64) -> Self {
        self.damage_multiplier = multiplier;
        self
    }

    pub fn with_cooldown(mut self, cooldown: u32) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_modifier(mut self, modifier: RollModifier) -> Self {
        self.roll_modifiers.push(modifier);
        self
    }

    pub fn with_trigger(mut self, trigger: ConditionalTrigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Same action data under a fresh identity
    pub fn duplicate(&self) -> Self {
        Self {
            id: ActionId::new(),
            combo_order: 0,
            ..self.clone()
        }
    }
}

/// A combatant
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    actions: Vec<Action>,
    combo: ComboSequence,
    pub effects: EffectStacks,
}

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ActorId::new(),
            name: name.into(),
            actions: Vec::new(),
            combo: ComboSequence::new(),
            effects: EffectStacks::new(),
        }
    }

    /// Add an action to the pool and return its id
    pub fn learn(&mut self, action: Action) -> ActionId {
        let id = action.id;
        self.actions.push(action);
        id
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn action(&self, id: ActionId) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn find_action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn combo(&self) -> &ComboSequence {
        &self.combo
    }

    pub fn combo_mut(&mut self) -> &mut ComboSequence {
        &mut self.combo
    }

    pub fn combo_step(&self) -> usize {
        self.combo.step()
    }

    /// Put a pool action at the end of the combo sequence
    pub fn add_to_combo(&mut self, id: ActionId) -> Result<u32, ComboError> {
        let action = self.action(id).ok_or(ComboError::UnknownAction(id))?.clone();
        let order = self.combo.add(action)?;
        self.sync_combo_orders();
        Ok(order)
    }

    /// Take an action out of the combo sequence; false if it was not in it
    pub fn remove_from_combo(&mut self, id: ActionId) -> bool {
        let removed = self.combo.remove(id).is_some();
        if removed {
            self.sync_combo_orders();
        }
        removed
    }

    pub fn reorder_combo(&mut self, order: &[ActionId]) -> Result<(), ComboError> {
        self.combo.reorder(order)?;
        self.sync_combo_orders();
        Ok(())
    }

    pub fn clear_combo(&mut self) {
        self.combo.clear();
        self.sync_combo_orders();
    }

    /// Apply an effect, including Disrupt which resets the combo step
    pub fn apply_effect(&mut self, kind: EffectKind, config: &EffectConfig) -> EffectChange {
        let change = self.effects.apply(kind, config);
        if kind == EffectKind::Disrupt {
            self.combo.disrupt();
        }
        debug!(actor = %self.name, effect = %kind, "effect applied");
        change
    }

    /// Mirror sequence positions onto the pool
    fn sync_combo_orders(&mut self) {
        for action in &mut self.actions {
            action.combo_order = self
                .combo
                .actions()
                .iter()
                .find(|c| c.id == action.id)
                .map(|c| c.combo_order)
                .unwrap_or(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::effects::StackKind;

    #[test]
    fn test_add_to_combo_orders() {
        let mut actor = Actor::new("Fighter");
        let a = actor.learn(Action::new("Jab").combo());
        let b = actor.learn(Action::new("Cross").combo());
        let c = actor.learn(Action::new("Hook").combo());

        assert_eq!(actor.add_to_combo(a).unwrap(), 1);
        assert_eq!(actor.add_to_combo(b).unwrap(), 2);
        assert_eq!(actor.add_to_combo(c).unwrap(), 3);
        assert_eq!(actor.action(c).unwrap().combo_order, 3);
    }

    #[test]
    fn test_add_to_combo_rejections() {
        let mut actor = Actor::new("Fighter");
        let jab = actor.learn(Action::new("Jab").combo());
        let wait = actor.learn(Action::new("Wait"));

        actor.add_to_combo(jab).unwrap();
        assert!(matches!(
            actor.add_to_combo(jab),
            Err(ComboError::AlreadyInSequence(_))
        ));
        assert!(matches!(
            actor.add_to_combo(wait),
            Err(ComboError::NotComboAction(_))
        ));
        assert!(matches!(
            actor.add_to_combo(ActionId::new()),
            Err(ComboError::UnknownAction(_))
        ));
        assert_eq!(actor.combo().len(), 1);
    }

    #[test]
    fn test_duplicate_name_allowed() {
        let mut actor = Actor::new("Fighter");
        let slash = Action::new("Slash").combo();
        let copy = slash.duplicate();
        let first = actor.learn(slash);
        let second = actor.learn(copy);

        actor.add_to_combo(first).unwrap();
        actor.add_to_combo(second).unwrap();
        assert_eq!(actor.combo().len(), 2);
    }

    #[test]
    fn test_remove_syncs_pool() {
        let mut actor = Actor::new("Fighter");
        let a = actor.learn(Action::new("A").combo());
        let b = actor.learn(Action::new("B").combo());
        let c = actor.learn(Action::new("C").combo());
        for id in [a, b, c] {
            actor.add_to_combo(id).unwrap();
        }

        assert!(actor.remove_from_combo(a));
        assert_eq!(actor.action(a).unwrap().combo_order, 0);
        assert_eq!(actor.action(b).unwrap().combo_order, 1);
        assert_eq!(actor.action(c).unwrap().combo_order, 2);
        assert!(!actor.remove_from_combo(a));
    }

    #[test]
    fn test_reorder_syncs_pool() {
        let mut actor = Actor::new("Fighter");
        let a = actor.learn(Action::new("A").combo());
        let b = actor.learn(Action::new("B").combo());
        actor.add_to_combo(a).unwrap();
        actor.add_to_combo(b).unwrap();

        actor.reorder_combo(&[b, a]).unwrap();
        assert_eq!(actor.action(b).unwrap().combo_order, 1);
        assert_eq!(actor.action(a).unwrap().combo_order, 2);
        assert_eq!(actor.combo().current().unwrap().id, b);

        actor.clear_combo();
        assert_eq!(actor.action(a).unwrap().combo_order, 0);
    }

    #[test]
    fn test_disrupt_resets_step_only() {
        let config = EffectConfig::default();
        let mut actor = Actor::new("Fighter");
        let a = actor.learn(Action::new("A").combo());
        let b = actor.learn(Action::new("B").combo());
        actor.add_to_combo(a).unwrap();
        actor.add_to_combo(b).unwrap();
        actor.combo_mut().advance();
        actor.effects.set_stacks(StackKind::Vulnerability, 2);

        actor.apply_effect(EffectKind::Disrupt, &config);
        assert_eq!(actor.combo_step(), 0);
        assert_eq!(actor.effects.stacks(StackKind::Vulnerability), 2);
        assert_eq!(actor.combo().len(), 2);
    }
}
