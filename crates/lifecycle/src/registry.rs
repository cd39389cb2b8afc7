//! State Registry: the closed set of states and their hooks.

use std::collections::HashMap;

use crate::hooks::{HookFn, Named};
use crate::machine::{Label, Machine};

/// Name under which first-arrival stamping shows up in executed-hook lists.
pub const STAMP_FIRST_ARRIVAL: &str = "stamp_first_arrival";

pub(crate) enum EnterStep<M: Machine> {
    Hook(Named<HookFn<M>>),
    StampFirstArrival,
}

impl<M: Machine> EnterStep<M> {
    fn name(&self) -> &'static str {
        match self {
            EnterStep::Hook(h) => h.name,
            EnterStep::StampFirstArrival => STAMP_FIRST_ARRIVAL,
        }
    }
}

/// Hooks attached to one state.
pub struct StateEntry<M: Machine> {
    pub(crate) state: M::State,
    pub(crate) exit: Vec<Named<HookFn<M>>>,
    pub(crate) before_enter: Vec<Named<HookFn<M>>>,
    pub(crate) enter: Vec<EnterStep<M>>,
}

impl<M: Machine> StateEntry<M> {
    pub fn state(&self) -> M::State {
        self.state
    }

    pub fn exit_hooks(&self) -> Vec<&'static str> {
        self.exit.iter().map(|h| h.name).collect()
    }

    pub fn before_enter_hooks(&self) -> Vec<&'static str> {
        self.before_enter.iter().map(|h| h.name).collect()
    }

    pub fn enter_hooks(&self) -> Vec<&'static str> {
        self.enter.iter().map(EnterStep::name).collect()
    }

    pub fn stamps_first_arrival(&self) -> bool {
        self.enter
            .iter()
            .any(|step| matches!(step, EnterStep::StampFirstArrival))
    }
}

/// Registered states in declaration order. Fixed once built.
pub struct StateRegistry<M: Machine> {
    order: Vec<M::State>,
    entries: HashMap<M::State, StateEntry<M>>,
}

impl<M: Machine> StateRegistry<M> {
    pub(crate) fn new(entries: Vec<StateEntry<M>>) -> Self {
        let order = entries.iter().map(|e| e.state).collect();
        let entries = entries.into_iter().map(|e| (e.state, e)).collect();
        Self { order, entries }
    }

    pub fn contains(&self, state: M::State) -> bool {
        self.entries.contains_key(&state)
    }

    pub fn hooks(&self, state: M::State) -> Option<&StateEntry<M>> {
        self.entries.get(&state)
    }

    pub fn states(&self) -> &[M::State] {
        &self.order
    }

    pub fn stamped_states(&self) -> Vec<M::State> {
        self.order
            .iter()
            .copied()
            .filter(|s| self.entries.get(s).is_some_and(StateEntry::stamps_first_arrival))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().map(Label::name)
    }
}
