//! A built, immutable lifecycle definition.

use std::collections::BTreeSet;

use crate::builder::LifecycleBuilder;
use crate::error::LifecycleError;
use crate::machine::{Label, Machine};
use crate::registry::StateRegistry;
use crate::table::{EventEntry, TransitionTable};

/// States plus transition table, verified at build time and shared
/// read-only by every engine that fires against it.
pub struct Lifecycle<M: Machine> {
    states: StateRegistry<M>,
    table: TransitionTable<M>,
}

impl<M: Machine> Lifecycle<M> {
    pub fn builder() -> LifecycleBuilder<M> {
        LifecycleBuilder::new()
    }

    pub(crate) fn from_parts(states: StateRegistry<M>, table: TransitionTable<M>) -> Self {
        Self { states, table }
    }

    pub fn states(&self) -> &StateRegistry<M> {
        &self.states
    }

    pub fn table(&self) -> &TransitionTable<M> {
        &self.table
    }

    pub fn has_state(&self, state: M::State) -> bool {
        self.states.contains(state)
    }

    pub(crate) fn ensure_state(&self, state: M::State) -> Result<(), LifecycleError> {
        if self.has_state(state) {
            Ok(())
        } else {
            Err(LifecycleError::UnknownState(state.name().to_string()))
        }
    }

    pub fn event(&self, event: M::Event) -> Result<&EventEntry<M>, LifecycleError> {
        self.table
            .get(event)
            .ok_or_else(|| LifecycleError::UnknownEvent(event.name().to_string()))
    }

    /// Resolve an event name coming from outside (API, queue, CLI).
    pub fn parse_event(&self, name: &str) -> Result<M::Event, LifecycleError> {
        M::Event::from_name(name)
            .filter(|event| self.table.get(*event).is_some())
            .ok_or_else(|| LifecycleError::UnknownEvent(name.to_string()))
    }

    pub fn parse_state(&self, name: &str) -> Result<M::State, LifecycleError> {
        M::State::from_name(name)
            .filter(|state| self.has_state(*state))
            .ok_or_else(|| LifecycleError::UnknownState(name.to_string()))
    }

    /// Events with at least one rule whose from-set includes `state`,
    /// ignoring guards.
    pub fn events_from(&self, state: M::State) -> Vec<M::Event> {
        self.table
            .entries()
            .filter(|entry| entry.accepts(state))
            .map(EventEntry::event)
            .collect()
    }

    /// Every destination an event can reach, in first-seen rule order.
    pub fn targets(&self, event: M::Event) -> Vec<M::State> {
        let mut seen = BTreeSet::new();
        self.table
            .get(event)
            .map(|entry| {
                entry
                    .rules()
                    .map(|rule| rule.to())
                    .filter(|to| seen.insert(to.name()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn state_names(&self) -> Vec<&'static str> {
        self.states.names().collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::testkit::{Stage, Step, test_lifecycle};

    #[test]
    fn events_from_ignores_guards() {
        let lifecycle = test_lifecycle();
        let events = lifecycle.events_from(Stage::ReadyToList);
        assert!(events.contains(&Step::Release));
        assert!(!events.contains(&Step::Receive));
    }

    #[test]
    fn parse_rejects_names_outside_the_lifecycle() {
        let lifecycle = test_lifecycle();
        assert_eq!(lifecycle.parse_event("release").ok(), Some(Step::Release));
        assert!(lifecycle.parse_event("teleport").is_err());
        assert_eq!(lifecycle.parse_state("listed").ok(), Some(Stage::Listed));
        assert!(lifecycle
            .parse_state("nowhere")
            .is_err_and(|e| e.is_configuration_error()));
    }

    #[test]
    fn targets_are_deduplicated_in_rule_order() {
        let lifecycle = test_lifecycle();
        assert_eq!(
            lifecycle.targets(Step::Release),
            vec![Stage::Lost, Stage::Listed, Stage::Stockroom]
        );
    }
}
