//! Guard and hook signatures, the context they see, and pipeline phases.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::engine::Committed;
use crate::invocation::Invocation;
use crate::machine::Machine;
use crate::subject::Subject;

/// Read-only predicate gating a transition rule.
///
/// Must not mutate persisted state; may read collaborators. An `Err` is a
/// failure of the whole `fire` call, distinct from a clean `false`.
pub type GuardFn<M> =
    Arc<dyn Fn(&Subject<M>, &HookContext<'_, M>) -> anyhow::Result<bool> + Send + Sync>;

/// Pre-commit side effect. An `Err` rolls the transition back.
pub type HookFn<M> =
    Arc<dyn Fn(&mut Subject<M>, &HookContext<'_, M>) -> anyhow::Result<()> + Send + Sync>;

/// Post-commit side effect. Failures are reported, never propagated.
pub type AfterCommitFn<M> = Arc<
    dyn Fn(&Committed<M>, &<M as Machine>::Services) -> anyhow::Result<()> + Send + Sync,
>;

/// Everything a guard or pre-commit hook may consult besides the subject.
pub struct HookContext<'a, M: Machine> {
    pub services: &'a M::Services,
    pub invocation: &'a Invocation<M::Event>,
    /// State the subject held when `fire` was called.
    pub from: M::State,
    /// Destination of the rule being evaluated or applied.
    pub to: M::State,
    pub now: DateTime<Utc>,
}

impl<M: Machine> HookContext<'_, M> {
    pub fn event(&self) -> M::Event {
        self.invocation.event()
    }

    /// `true` for re-affirming transitions (from == to).
    pub fn is_reentry(&self) -> bool {
        self.from == self.to
    }
}

/// Pipeline phase a hook ran in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Phase {
    Before,
    Exit,
    BeforeEnter,
    Enter,
    After,
    Rule,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Before => "before",
            Phase::Exit => "exit",
            Phase::BeforeEnter => "before_enter",
            Phase::Enter => "enter",
            Phase::After => "after",
            Phase::Rule => "rule",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One executed pre-commit step, in execution order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExecutedHook {
    pub phase: Phase,
    pub name: &'static str,
}

impl ExecutedHook {
    pub fn new(phase: Phase, name: &'static str) -> Self {
        Self { phase, name }
    }
}

impl fmt::Display for ExecutedHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.phase, self.name)
    }
}

/// A resolved, named callable.
pub(crate) struct Named<F> {
    pub(crate) name: &'static str,
    pub(crate) f: F,
}

impl<F: Clone> Clone for Named<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            f: self.f.clone(),
        }
    }
}

impl<F> fmt::Debug for Named<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
