//! Declarative construction of a [`Lifecycle`], verified at build time.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;

use crate::engine::Committed;
use crate::hooks::{AfterCommitFn, GuardFn, HookContext, HookFn, Named};
use crate::lifecycle::Lifecycle;
use crate::machine::{Label, Machine};
use crate::registry::{EnterStep, StateEntry, StateRegistry};
use crate::subject::Subject;
use crate::table::{CompiledRule, EventEntry, Rule, TransitionTable};

/// Misconfiguration detected while building a lifecycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("state '{0}' registered twice")]
    DuplicateState(&'static str),

    #[error("event '{0}' registered twice")]
    DuplicateEvent(&'static str),

    #[error("{kind} '{name}' registered twice")]
    DuplicateName { kind: &'static str, name: &'static str },

    #[error("event '{event}' references unregistered state '{state}'")]
    UnregisteredState {
        event: &'static str,
        state: &'static str,
    },

    #[error("event '{0}' has no transition rules")]
    EmptyEvent(&'static str),

    #[error("unknown guard '{guard}' referenced by event '{event}'")]
    UnknownGuard {
        event: &'static str,
        guard: &'static str,
    },

    #[error("unknown hook '{hook}' referenced by {owner}")]
    UnknownHook { owner: String, hook: &'static str },

    #[error("unknown after-commit hook '{hook}' referenced by event '{event}'")]
    UnknownAfterCommitHook {
        event: &'static str,
        hook: &'static str,
    },
}

enum EnterSpec {
    Hook(&'static str),
    Stamp,
}

/// Hook configuration of one state, referenced by name.
pub struct StateSpec<S> {
    state: S,
    exit: Vec<&'static str>,
    before_enter: Vec<&'static str>,
    enter: Vec<EnterSpec>,
}

impl<S: Label> StateSpec<S> {
    fn new(state: S) -> Self {
        Self {
            state,
            exit: Vec::new(),
            before_enter: Vec::new(),
            enter: Vec::new(),
        }
    }

    /// Runs when leaving this state, whatever the destination.
    pub fn on_exit(mut self, hook: &'static str) -> Self {
        self.exit.push(hook);
        self
    }

    /// Runs after the state is assigned, ahead of the enter hooks.
    pub fn before_enter(mut self, hook: &'static str) -> Self {
        self.before_enter.push(hook);
        self
    }

    /// Runs when arriving in this state, whatever the origin.
    pub fn on_enter(mut self, hook: &'static str) -> Self {
        self.enter.push(EnterSpec::Hook(hook));
        self
    }

    /// Stamp the first-arrival instant (set-once) at this point of the enter
    /// sequence.
    pub fn stamp_first_arrival(mut self) -> Self {
        self.enter.push(EnterSpec::Stamp);
        self
    }
}

/// Rules and event-level hooks of one event, referenced by name.
pub struct EventSpec<M: Machine> {
    event: M::Event,
    rules: Vec<Rule<M::State>>,
    before: Vec<&'static str>,
    after: Vec<&'static str>,
    after_commit: Vec<&'static str>,
}

impl<M: Machine> EventSpec<M> {
    fn new(event: M::Event) -> Self {
        Self {
            event,
            rules: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            after_commit: Vec::new(),
        }
    }

    /// Append a rule; rules are evaluated in the order they are added.
    pub fn rule(mut self, rule: Rule<M::State>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Shorthand for an unconditional rule.
    pub fn transition(self, from: impl IntoIterator<Item = M::State>, to: M::State) -> Self {
        self.rule(Rule::new(from, to))
    }

    pub fn before(mut self, hook: &'static str) -> Self {
        self.before.push(hook);
        self
    }

    pub fn after(mut self, hook: &'static str) -> Self {
        self.after.push(hook);
        self
    }

    pub fn after_commit(mut self, hook: &'static str) -> Self {
        self.after_commit.push(hook);
        self
    }
}

/// Collects states, events, and named guards/hooks; `build()` resolves every
/// name and rejects anything that does not line up.
pub struct LifecycleBuilder<M: Machine> {
    guards: HashMap<&'static str, GuardFn<M>>,
    hooks: HashMap<&'static str, HookFn<M>>,
    after_commit_hooks: HashMap<&'static str, AfterCommitFn<M>>,
    states: Vec<StateSpec<M::State>>,
    events: Vec<EventSpec<M>>,
    every_commit: Vec<&'static str>,
    duplicate: Option<BuildError>,
}

impl<M: Machine> Default for LifecycleBuilder<M> {
    fn default() -> Self {
        Self {
            guards: HashMap::new(),
            hooks: HashMap::new(),
            after_commit_hooks: HashMap::new(),
            states: Vec::new(),
            events: Vec::new(),
            every_commit: Vec::new(),
            duplicate: None,
        }
    }
}

impl<M: Machine> LifecycleBuilder<M> {
    pub fn new() -> Self {
        Self::default()
    }

    fn note_duplicate(&mut self, kind: &'static str, name: &'static str) {
        if self.duplicate.is_none() {
            self.duplicate = Some(BuildError::DuplicateName { kind, name });
        }
    }

    pub fn guard<F>(mut self, name: &'static str, guard: F) -> Self
    where
        F: Fn(&Subject<M>, &HookContext<'_, M>) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        if self.guards.insert(name, Arc::new(guard)).is_some() {
            self.note_duplicate("guard", name);
        }
        self
    }

    pub fn hook<F>(mut self, name: &'static str, hook: F) -> Self
    where
        F: Fn(&mut Subject<M>, &HookContext<'_, M>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        if self.hooks.insert(name, Arc::new(hook)).is_some() {
            self.note_duplicate("hook", name);
        }
        self
    }

    pub fn after_commit_hook<F>(mut self, name: &'static str, hook: F) -> Self
    where
        F: Fn(&Committed<M>, &M::Services) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        if self.after_commit_hooks.insert(name, Arc::new(hook)).is_some() {
            self.note_duplicate("after-commit hook", name);
        }
        self
    }

    /// Register a state with its hooks.
    pub fn state(
        mut self,
        state: M::State,
        configure: impl FnOnce(StateSpec<M::State>) -> StateSpec<M::State>,
    ) -> Self {
        self.states.push(configure(StateSpec::new(state)));
        self
    }

    /// Register states that carry no hooks.
    pub fn states(mut self, states: impl IntoIterator<Item = M::State>) -> Self {
        self.states.extend(states.into_iter().map(StateSpec::new));
        self
    }

    /// Register an event with its ordered rules and event-level hooks.
    pub fn event(
        mut self,
        event: M::Event,
        configure: impl FnOnce(EventSpec<M>) -> EventSpec<M>,
    ) -> Self {
        self.events.push(configure(EventSpec::new(event)));
        self
    }

    /// Attach an after-commit hook to every event, ahead of the event's own.
    pub fn after_every_commit(mut self, hook: &'static str) -> Self {
        self.every_commit.push(hook);
        self
    }

    pub fn build(self) -> Result<Lifecycle<M>, BuildError> {
        if let Some(err) = self.duplicate {
            return Err(err);
        }

        let mut seen_states = HashSet::new();
        let mut state_entries = Vec::with_capacity(self.states.len());
        for spec in self.states {
            if !seen_states.insert(spec.state) {
                return Err(BuildError::DuplicateState(spec.state.name()));
            }
            let owner = format!("state '{}'", spec.state.name());
            let enter = spec
                .enter
                .into_iter()
                .map(|step| match step {
                    EnterSpec::Hook(name) => {
                        resolve(&self.hooks, name, &owner).map(EnterStep::Hook)
                    }
                    EnterSpec::Stamp => Ok(EnterStep::StampFirstArrival),
                })
                .collect::<Result<Vec<_>, _>>()?;

            state_entries.push(StateEntry {
                state: spec.state,
                exit: resolve_all(&self.hooks, &spec.exit, &owner)?,
                before_enter: resolve_all(&self.hooks, &spec.before_enter, &owner)?,
                enter,
            });
        }

        let mut seen_events = HashSet::new();
        let mut event_entries = Vec::with_capacity(self.events.len());
        for spec in self.events {
            let event = spec.event.name();
            if !seen_events.insert(spec.event) {
                return Err(BuildError::DuplicateEvent(event));
            }
            if spec.rules.is_empty() {
                return Err(BuildError::EmptyEvent(event));
            }
            let owner = format!("event '{event}'");

            let mut rules = Vec::with_capacity(spec.rules.len());
            for rule in spec.rules {
                let referenced = rule
                    .from_states()
                    .states()
                    .unwrap_or_default()
                    .iter()
                    .copied()
                    .chain(std::iter::once(rule.to()));
                for state in referenced {
                    if !seen_states.contains(&state) {
                        return Err(BuildError::UnregisteredState {
                            event,
                            state: state.name(),
                        });
                    }
                }

                let guard = match rule.guard() {
                    Some(guard_ref) => Some(
                        self.guards
                            .get(guard_ref.name)
                            .cloned()
                            .ok_or(BuildError::UnknownGuard {
                                event,
                                guard: guard_ref.name,
                            })?,
                    ),
                    None => None,
                };
                let hook = match rule.hook() {
                    Some(name) => Some(resolve(&self.hooks, name, &owner)?),
                    None => None,
                };
                rules.push(CompiledRule { rule, guard, hook });
            }

            let after_commit = self
                .every_commit
                .iter()
                .chain(&spec.after_commit)
                .map(|&name| {
                    self.after_commit_hooks
                        .get(name)
                        .cloned()
                        .map(|f| Named { name, f })
                        .ok_or(BuildError::UnknownAfterCommitHook { event, hook: name })
                })
                .collect::<Result<Vec<_>, _>>()?;

            event_entries.push(EventEntry {
                event: spec.event,
                rules,
                before: resolve_all(&self.hooks, &spec.before, &owner)?,
                after: resolve_all(&self.hooks, &spec.after, &owner)?,
                after_commit,
            });
        }

        Ok(Lifecycle::from_parts(
            StateRegistry::new(state_entries),
            TransitionTable::new(event_entries),
        ))
    }
}

fn resolve<M: Machine>(
    hooks: &HashMap<&'static str, HookFn<M>>,
    name: &'static str,
    owner: &str,
) -> Result<Named<HookFn<M>>, BuildError> {
    hooks
        .get(name)
        .cloned()
        .map(|f| Named { name, f })
        .ok_or_else(|| BuildError::UnknownHook {
            owner: owner.to_string(),
            hook: name,
        })
}

fn resolve_all<M: Machine>(
    hooks: &HashMap<&'static str, HookFn<M>>,
    names: &[&'static str],
    owner: &str,
) -> Result<Vec<Named<HookFn<M>>>, BuildError> {
    names.iter().map(|&name| resolve(hooks, name, owner)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{Stage, Step, TestMachine};

    fn base() -> LifecycleBuilder<TestMachine> {
        LifecycleBuilder::new().states([Stage::Drafted, Stage::Stockroom])
    }

    fn build_err(builder: LifecycleBuilder<TestMachine>) -> BuildError {
        match builder.build() {
            Ok(_) => panic!("expected build to fail"),
            Err(e) => e,
        }
    }

    #[test]
    fn unknown_guard_is_rejected() {
        let err = build_err(base().event(Step::Receive, |e| {
            e.rule(Rule::new([Stage::Drafted], Stage::Stockroom).when("missing"))
        }));
        assert_eq!(
            err,
            BuildError::UnknownGuard {
                event: "receive",
                guard: "missing"
            }
        );
    }

    #[test]
    fn unknown_state_hook_names_its_owner() {
        let err = build_err(
            LifecycleBuilder::<TestMachine>::new().state(Stage::Drafted, |s| s.on_exit("nope")),
        );
        assert_eq!(
            err,
            BuildError::UnknownHook {
                owner: "state 'drafted'".to_string(),
                hook: "nope"
            }
        );
    }

    #[test]
    fn rule_targeting_unregistered_state_is_rejected() {
        let err = build_err(base().event(Step::Receive, |e| {
            e.transition([Stage::Drafted], Stage::Listed)
        }));
        assert_eq!(
            err,
            BuildError::UnregisteredState {
                event: "receive",
                state: "listed"
            }
        );
    }

    #[test]
    fn duplicates_are_rejected() {
        let err = build_err(base().states([Stage::Drafted]));
        assert_eq!(err, BuildError::DuplicateState("drafted"));

        let err = build_err(
            base()
                .guard("g", |_, _| Ok(true))
                .guard("g", |_, _| Ok(false)),
        );
        assert_eq!(
            err,
            BuildError::DuplicateName {
                kind: "guard",
                name: "g"
            }
        );

        let err = build_err(
            base()
                .event(Step::Receive, |e| e.transition([Stage::Drafted], Stage::Stockroom))
                .event(Step::Receive, |e| e.transition([Stage::Drafted], Stage::Stockroom)),
        );
        assert_eq!(err, BuildError::DuplicateEvent("receive"));
    }

    #[test]
    fn event_without_rules_is_rejected() {
        let err = build_err(base().event(Step::Receive, |e| e));
        assert_eq!(err, BuildError::EmptyEvent("receive"));
    }

    #[test]
    fn every_commit_hooks_run_ahead_of_event_hooks() {
        let lifecycle = base()
            .after_commit_hook("audit", |_, _| Ok(()))
            .after_commit_hook("announce", |_, _| Ok(()))
            .event(Step::Receive, |e| {
                e.transition([Stage::Drafted], Stage::Stockroom)
                    .after_commit("announce")
            })
            .after_every_commit("audit")
            .build()
            .unwrap();

        let entry = lifecycle.event(Step::Receive).unwrap();
        assert_eq!(entry.after_commit_hooks(), vec!["audit", "announce"]);
    }

    #[test]
    fn unknown_after_commit_hook_is_rejected() {
        let err = build_err(base().event(Step::Receive, |e| {
            e.transition([Stage::Drafted], Stage::Stockroom)
                .after_commit("announce")
        }));
        assert_eq!(
            err,
            BuildError::UnknownAfterCommitHook {
                event: "receive",
                hook: "announce"
            }
        );
    }
}
