//! Transition Table: per event, an ordered list of rules, plus rule selection.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::LifecycleError;
use crate::hooks::{AfterCommitFn, GuardFn, HookContext, HookFn, Named};
use crate::invocation::Invocation;
use crate::machine::{Label, Machine};
use crate::subject::Subject;

/// Eligible source states of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FromStates<S> {
    Any,
    Only(Vec<S>),
}

impl<S: Label> FromStates<S> {
    pub fn contains(&self, state: S) -> bool {
        match self {
            FromStates::Any => true,
            FromStates::Only(states) => states.contains(&state),
        }
    }

    pub fn states(&self) -> Option<&[S]> {
        match self {
            FromStates::Any => None,
            FromStates::Only(states) => Some(states),
        }
    }
}

/// Reference to a named guard, optionally negated (`unless`).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GuardRef {
    pub name: &'static str,
    pub negated: bool,
}

/// Declarative transition rule: `from → to`, optional guard, optional
/// rule-specific post-transition hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule<S> {
    from: FromStates<S>,
    to: S,
    guard: Option<GuardRef>,
    hook: Option<&'static str>,
}

impl<S: Label> Rule<S> {
    pub fn new(from: impl IntoIterator<Item = S>, to: S) -> Self {
        Self {
            from: FromStates::Only(from.into_iter().collect()),
            to,
            guard: None,
            hook: None,
        }
    }

    pub fn from_any(to: S) -> Self {
        Self {
            from: FromStates::Any,
            to,
            guard: None,
            hook: None,
        }
    }

    /// Apply only when the named guard returns `true`.
    pub fn when(mut self, guard: &'static str) -> Self {
        self.guard = Some(GuardRef {
            name: guard,
            negated: false,
        });
        self
    }

    /// Apply only when the named guard returns `false`.
    pub fn unless(mut self, guard: &'static str) -> Self {
        self.guard = Some(GuardRef {
            name: guard,
            negated: true,
        });
        self
    }

    /// Run the named hook after the event-level `after` hooks.
    pub fn then(mut self, hook: &'static str) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn from_states(&self) -> &FromStates<S> {
        &self.from
    }

    pub fn to(&self) -> S {
        self.to
    }

    pub fn guard(&self) -> Option<GuardRef> {
        self.guard
    }

    pub fn hook(&self) -> Option<&'static str> {
        self.hook
    }
}

pub(crate) struct CompiledRule<M: Machine> {
    pub(crate) rule: Rule<M::State>,
    pub(crate) guard: Option<GuardFn<M>>,
    pub(crate) hook: Option<Named<HookFn<M>>>,
}

/// Everything registered under one event.
pub struct EventEntry<M: Machine> {
    pub(crate) event: M::Event,
    pub(crate) rules: Vec<CompiledRule<M>>,
    pub(crate) before: Vec<Named<HookFn<M>>>,
    pub(crate) after: Vec<Named<HookFn<M>>>,
    pub(crate) after_commit: Vec<Named<AfterCommitFn<M>>>,
}

impl<M: Machine> EventEntry<M> {
    pub fn event(&self) -> M::Event {
        self.event
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule<M::State>> {
        self.rules.iter().map(|r| &r.rule)
    }

    pub fn after_commit_hooks(&self) -> Vec<&'static str> {
        self.after_commit.iter().map(|h| h.name).collect()
    }

    /// Whether any rule lists `state` as an eligible source.
    pub fn accepts(&self, state: M::State) -> bool {
        self.rules.iter().any(|r| r.rule.from.contains(state))
    }

    /// First rule whose from-set contains the subject's state and whose guard
    /// passes (absent guard = pass). Rules are tried in declaration order.
    pub(crate) fn select(
        &self,
        subject: &Subject<M>,
        invocation: &Invocation<M::Event>,
        services: &M::Services,
        now: DateTime<Utc>,
    ) -> Result<Option<(usize, &CompiledRule<M>)>, LifecycleError> {
        let from = subject.state();

        for (index, compiled) in self.rules.iter().enumerate() {
            if !compiled.rule.from.contains(from) {
                continue;
            }

            let passes = match (&compiled.rule.guard, &compiled.guard) {
                (None, _) => true,
                (Some(guard_ref), None) => {
                    return Err(LifecycleError::GuardFailure {
                        event: self.event.name(),
                        guard: guard_ref.name,
                        source: format!("guard '{}' has no compiled predicate", guard_ref.name)
                            .into(),
                    });
                }
                (Some(guard_ref), Some(guard)) => {
                    let ctx = HookContext {
                        services,
                        invocation,
                        from,
                        to: compiled.rule.to,
                        now,
                    };
                    let verdict = guard(subject, &ctx).map_err(|e| LifecycleError::GuardFailure {
                        event: self.event.name(),
                        guard: guard_ref.name,
                        source: e.into(),
                    })?;
                    verdict != guard_ref.negated
                }
            };

            tracing::trace!(
                rule = index,
                to = compiled.rule.to.name(),
                passes,
                "evaluated transition rule"
            );

            if passes {
                return Ok(Some((index, compiled)));
            }
        }

        Ok(None)
    }
}

/// All events of a lifecycle, in declaration order.
pub struct TransitionTable<M: Machine> {
    order: Vec<M::Event>,
    entries: HashMap<M::Event, EventEntry<M>>,
}

impl<M: Machine> TransitionTable<M> {
    pub(crate) fn new(entries: Vec<EventEntry<M>>) -> Self {
        let order = entries.iter().map(|e| e.event).collect();
        let entries = entries.into_iter().map(|e| (e.event, e)).collect();
        Self { order, entries }
    }

    pub fn get(&self, event: M::Event) -> Option<&EventEntry<M>> {
        self.entries.get(&event)
    }

    pub fn events(&self) -> &[M::Event] {
        &self.order
    }

    pub fn entries(&self) -> impl Iterator<Item = &EventEntry<M>> {
        self.order.iter().filter_map(|e| self.entries.get(e))
    }
}
