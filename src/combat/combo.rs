//! Combo state machine
//!
//! Each actor owns an ordered sequence of combo actions and a step index
//! into it. Combo-grade rolls advance the step (wrapping), misses reset it,
//! plain hits leave it alone. Any structural change resets the step.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::actor::{Action, ActionId};
use super::categorize::RollCategory;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComboError {
    #[error("action '{0}' is not a combo action")]
    NotComboAction(String),

    #[error("action '{0}' is already in the combo sequence")]
    AlreadyInSequence(String),

    #[error("unknown action: {0}")]
    UnknownAction(ActionId),

    #[error("combo order must be a permutation of the current sequence")]
    InvalidOrder,
}

/// What a categorized roll did to the combo step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComboTransition {
    Advanced { from: usize, to: usize, wrapped: bool },
    Reset { from: usize },
    Unchanged,
}

/// Ordered combo actions plus the current step
#[derive(Debug, Clone, Default)]
pub struct ComboSequence {
    actions: Vec<Action>,
    step: usize,
}

impl ComboSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn contains(&self, id: ActionId) -> bool {
        self.actions.iter().any(|a| a.id == id)
    }

    /// Action at the current step
    pub fn current(&self) -> Option<&Action> {
        if self.actions.is_empty() {
            return None;
        }
        self.actions.get(self.step % self.actions.len())
    }

    /// Move to the next step, wrapping at the end
    pub fn advance(&mut self) -> ComboTransition {
        let len = self.actions.len();
        if len == 0 {
            self.step = 0;
            return ComboTransition::Unchanged;
        }
        let from = self.step;
        let to = (from + 1) % len;
        self.step = to;
        ComboTransition::Advanced {
            from,
            to,
            wrapped: to == 0,
        }
    }

    /// Drive the state machine with a categorized roll
    pub fn on_outcome(&mut self, category: RollCategory) -> ComboTransition {
        let transition = match category {
            RollCategory::ComboAction | RollCategory::CriticalHitCombo => self.advance(),
            RollCategory::Miss | RollCategory::CriticalMiss => {
                if self.step > 0 {
                    let from = self.step;
                    self.step = 0;
                    ComboTransition::Reset { from }
                } else {
                    ComboTransition::Unchanged
                }
            }
            RollCategory::Hit | RollCategory::CriticalHit => ComboTransition::Unchanged,
        };

        if transition != ComboTransition::Unchanged {
            debug!(%category, ?transition, "combo step changed");
        }
        transition
    }

    /// Force the step back to the start
    pub fn disrupt(&mut self) {
        if self.step != 0 {
            debug!(from = self.step, "combo disrupted");
        }
        self.step = 0;
    }

    /// Append a combo action; its order becomes its 1-based position
    pub fn add(&mut self, mut action: Action) -> Result<u32, ComboError> {
        if !action.is_combo_action {
            return Err(ComboError::NotComboAction(action.name));
        }
        if self.contains(action.id) {
            return Err(ComboError::AlreadyInSequence(action.name));
        }

        let order = self.actions.len() as u32 + 1;
        action.combo_order = order;
        debug!(action = %action.name, order, "added to combo");
        self.actions.push(action);
        self.step = 0;
        Ok(order)
    }

    /// Remove an action instance; absent ids leave the sequence untouched
    pub fn remove(&mut self, id: ActionId) -> Option<Action> {
        let index = self.actions.iter().position(|a| a.id == id)?;
        let mut removed = self.actions.remove(index);
        removed.combo_order = 0;
        self.renumber();
        self.step = 0;
        debug!(action = %removed.name, "removed from combo");
        Some(removed)
    }

    /// Replace the order with a permutation of the current ids
    pub fn reorder(&mut self, order: &[ActionId]) -> Result<(), ComboError> {
        if order.len() != self.actions.len() {
            return Err(ComboError::InvalidOrder);
        }

        let mut remaining = std::mem::take(&mut self.actions);
        let mut reordered = Vec::with_capacity(remaining.len());
        for id in order {
            match remaining.iter().position(|a| a.id == *id) {
                Some(index) => reordered.push(remaining.swap_remove(index)),
                None => {
                    // Put back what we took so a failed reorder is a no-op
                    let mut restored = reordered;
                    restored.append(&mut remaining);
                    restored.sort_by_key(|a| a.combo_order);
                    self.actions = restored;
                    return Err(ComboError::InvalidOrder);
                }
            }
        }

        self.actions = reordered;
        self.renumber();
        self.step = 0;
        Ok(())
    }

    pub fn clear(&mut self) -> Vec<Action> {
        self.step = 0;
        let mut removed = std::mem::take(&mut self.actions);
        for action in &mut removed {
            action.combo_order = 0;
        }
        removed
    }

    fn renumber(&mut self) {
        for (index, action) in self.actions.iter_mut().enumerate() {
            action.combo_order = index as u32 + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combo_action(name: &str) -> Action {
        Action::new(name).combo()
    }

    fn sequence(names: &[&str]) -> ComboSequence {
        let mut seq = ComboSequence::new();
        for name in names {
            seq.add(combo_action(name)).unwrap();
        }
        seq
    }

    fn names(seq: &ComboSequence) -> Vec<&str> {
        seq.actions().iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn test_empty_sequence() {
        let mut seq = ComboSequence::new();
        assert!(seq.current().is_none());
        assert_eq!(seq.advance(), ComboTransition::Unchanged);
        assert_eq!(seq.step(), 0);
        assert_eq!(seq.on_outcome(RollCategory::ComboAction), ComboTransition::Unchanged);
    }

    #[test]
    fn test_advance_wraps() {
        let mut seq = sequence(&["A", "B", "C"]);
        assert_eq!(seq.current().unwrap().name, "A");

        seq.advance();
        assert_eq!(seq.current().unwrap().name, "B");
        seq.advance();
        assert_eq!(seq.current().unwrap().name, "C");
        assert_eq!(
            seq.advance(),
            ComboTransition::Advanced {
                from: 2,
                to: 0,
                wrapped: true
            }
        );
        assert_eq!(seq.current().unwrap().name, "A");
    }

    #[test]
    fn test_step_is_k_mod_n() {
        for n in 1..=5 {
            let names: Vec<String> = (0..n).map(|i| format!("move{}", i)).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let mut seq = sequence(&refs);
            for k in 1..=17 {
                seq.advance();
                assert_eq!(seq.step(), k % n);
                assert!(seq.step() < seq.len());
            }
        }
    }

    #[test]
    fn test_outcome_transitions() {
        let mut seq = sequence(&["A", "B", "C"]);

        assert_eq!(seq.on_outcome(RollCategory::Hit), ComboTransition::Unchanged);
        assert_eq!(seq.on_outcome(RollCategory::Miss), ComboTransition::Unchanged);
        seq.on_outcome(RollCategory::ComboAction);
        seq.on_outcome(RollCategory::CriticalHitCombo);
        assert_eq!(seq.step(), 2);

        assert_eq!(seq.on_outcome(RollCategory::CriticalHit), ComboTransition::Unchanged);
        assert_eq!(seq.step(), 2);

        assert_eq!(
            seq.on_outcome(RollCategory::CriticalMiss),
            ComboTransition::Reset { from: 2 }
        );
        assert_eq!(seq.step(), 0);
    }

    #[test]
    fn test_disrupt() {
        let mut seq = sequence(&["A", "B"]);
        seq.advance();
        seq.disrupt();
        assert_eq!(seq.step(), 0);
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn test_add_assigns_order_and_resets() {
        let mut seq = sequence(&["A", "B"]);
        seq.advance();

        assert_eq!(seq.add(combo_action("C")).unwrap(), 3);
        assert_eq!(seq.step(), 0);
        let orders: Vec<u32> = seq.actions().iter().map(|a| a.combo_order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[test]
    fn test_add_rejections_do_not_mutate() {
        let mut seq = ComboSequence::new();
        let a = combo_action("A");
        seq.add(a.clone()).unwrap();
        seq.add(combo_action("B")).unwrap();
        seq.advance();

        assert_eq!(
            seq.add(a.clone()),
            Err(ComboError::AlreadyInSequence("A".to_string()))
        );
        assert_eq!(
            seq.add(Action::new("Wait")),
            Err(ComboError::NotComboAction("Wait".to_string()))
        );
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.step(), 1);
    }

    #[test]
    fn test_same_name_different_instance() {
        let mut seq = ComboSequence::new();
        seq.add(combo_action("Slash")).unwrap();
        seq.add(combo_action("Slash")).unwrap();
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn test_remove_renumbers() {
        let mut seq = ComboSequence::new();
        let b = combo_action("B");
        seq.add(combo_action("A")).unwrap();
        seq.add(b.clone()).unwrap();
        seq.add(combo_action("C")).unwrap();
        seq.advance();
        seq.advance();

        let removed = seq.remove(b.id).unwrap();
        assert_eq!(removed.combo_order, 0);
        assert_eq!(names(&seq), vec!["A", "C"]);
        let orders: Vec<u32> = seq.actions().iter().map(|a| a.combo_order).collect();
        assert_eq!(orders, vec![1, 2]);
        assert_eq!(seq.step(), 0);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut seq = sequence(&["A", "B"]);
        seq.advance();
        assert!(seq.remove(ActionId::new()).is_none());
        assert_eq!(seq.step(), 1);
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn test_reorder() {
        let mut seq = sequence(&["A", "B", "C"]);
        let ids: Vec<ActionId> = seq.actions().iter().map(|a| a.id).collect();
        seq.advance();

        seq.reorder(&[ids[2], ids[0], ids[1]]).unwrap();
        assert_eq!(names(&seq), vec!["C", "A", "B"]);
        assert_eq!(seq.actions()[0].combo_order, 1);
        assert_eq!(seq.step(), 0);
    }

    #[test]
    fn test_reorder_rejects_non_permutation() {
        let mut seq = sequence(&["A", "B", "C"]);
        let ids: Vec<ActionId> = seq.actions().iter().map(|a| a.id).collect();

        assert_eq!(seq.reorder(&[ids[0], ids[1]]), Err(ComboError::InvalidOrder));
        assert_eq!(
            seq.reorder(&[ids[0], ids[0], ids[1]]),
            Err(ComboError::InvalidOrder)
        );
        assert_eq!(
            seq.reorder(&[ids[0], ids[1], ActionId::new()]),
            Err(ComboError::InvalidOrder)
        );
        assert_eq!(names(&seq), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_clear() {
        let mut seq = sequence(&["A", "B"]);
        seq.advance();
        let removed = seq.clear();
        assert_eq!(removed.len(), 2);
        assert!(removed.iter().all(|a| a.combo_order == 0));
        assert!(seq.is_empty());
        assert_eq!(seq.step(), 0);
    }
}
