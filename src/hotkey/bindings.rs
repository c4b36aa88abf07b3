//! Binding table: canonical combination -> action

use std::collections::BTreeMap;

use super::callback::Callback;
use super::combination::{Combination, CombinationMatcher};
use super::error::HotkeyError;
use super::keys::Key;
use super::listener::KeyAction;

/// What a binding does when its combination is satisfied
#[derive(Debug, Clone)]
pub enum BindingAction {
    /// Run a user callback
    Callback(Callback),
    /// Arm the chord engine
    Activator,
}

/// One registered combination
#[derive(Debug)]
pub struct Binding {
    combination: Combination,
    /// Combination as the caller spelled it
    label: String,
    action: BindingAction,
    matcher: CombinationMatcher,
}

impl Binding {
    fn new(combination: Combination, label: &str, action: BindingAction) -> Self {
        let matcher = CombinationMatcher::new(&combination);
        Self {
            combination,
            label: label.trim().to_string(),
            action,
            matcher,
        }
    }

    pub fn combination(&self) -> &Combination {
        &self.combination
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn action(&self) -> &BindingAction {
        &self.action
    }

    pub fn is_activator(&self) -> bool {
        matches!(self.action, BindingAction::Activator)
    }
}

/// A binding whose combination was completed by a key press
#[derive(Debug, Clone)]
pub struct Hit {
    pub combination: Combination,
    pub action: BindingAction,
}

/// Unique map of combinations to bindings
#[derive(Debug, Default)]
pub struct BindingTable {
    bindings: BTreeMap<Combination, Binding>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn get(&self, combination: &Combination) -> Option<&Binding> {
        self.bindings.get(combination)
    }

    /// Insert a new binding; fails without mutating if the combination
    /// is already present
    pub fn insert(
        &mut self,
        combination: Combination,
        label: &str,
        action: BindingAction,
    ) -> Result<(), HotkeyError> {
        if self.bindings.contains_key(&combination) {
            return Err(HotkeyError::DuplicateRegistration {
                combination: combination.to_string(),
            });
        }
        let binding = Binding::new(combination.clone(), label, action);
        self.bindings.insert(combination, binding);
        Ok(())
    }

    pub fn remove(&mut self, combination: &Combination) -> Option<Binding> {
        self.bindings.remove(combination)
    }

    /// The combination currently bound as the chord activator, if any
    pub fn activator(&self) -> Option<&Combination> {
        self.bindings
            .values()
            .find(|b| b.is_activator())
            .map(|b| &b.combination)
    }

    /// Labels of all bindings, in canonical combination order
    pub fn labels(&self) -> Vec<String> {
        self.bindings.values().map(|b| b.label.clone()).collect()
    }

    /// Feed one normalized key event to every matcher, returning the
    /// bindings a press completed
    pub fn feed(&mut self, action: KeyAction, key: Key) -> Vec<Hit> {
        let mut hits = Vec::new();
        for binding in self.bindings.values_mut() {
            match action {
                KeyAction::Press => {
                    if binding.matcher.press(key) {
                        hits.push(Hit {
                            combination: binding.combination.clone(),
                            action: binding.action.clone(),
                        });
                    }
                }
                KeyAction::Release => binding.matcher.release(key),
            }
        }
        hits
    }

    /// Clear the held-key state of every matcher
    pub fn reset_matchers(&mut self) {
        for binding in self.bindings.values_mut() {
            binding.matcher.reset();
        }
    }
}
