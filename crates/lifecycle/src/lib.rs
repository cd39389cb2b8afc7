//! Guarded lifecycle state machine.
//!
//! A [`Lifecycle`] is built once from a declarative description (states with
//! their hooks, events with ordered transition rules, named guards and hooks)
//! and verified at build time. The [`LifecycleEngine`] fires events against
//! persisted [`Subject`]s:
//!
//! ```text
//! fire(id, invocation, services)
//!   ↓ lock entity, load current row
//!   ↓ select first rule (from-set ∋ state, guard passes)
//!   ↓ before → exit → state := to → before_enter → enter → after → rule hook
//!   ↓ commit row + history record (single write)
//!   ↓ unlock
//!   ↓ after-commit hooks (best-effort, isolated)
//! ```
//!
//! Nothing in this crate performs IO on its own; storage and collaborators
//! come in through [`SubjectStore`] and the machine's `Services` type.

pub mod audit;
pub mod builder;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod invocation;
pub mod lifecycle;
pub mod locks;
pub mod machine;
pub mod notifier;
pub mod registry;
pub mod store;
pub mod subject;
pub mod table;

#[cfg(test)]
mod testkit;

pub use audit::{AuditRecorder, History, HistoryRecord};
pub use builder::{BuildError, EventSpec, LifecycleBuilder, StateSpec};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::{Committed, Fired, LifecycleEngine};
pub use error::{BoxError, LifecycleError};
pub use hooks::{AfterCommitFn, ExecutedHook, GuardFn, HookContext, HookFn, Phase};
pub use invocation::Invocation;
pub use lifecycle::Lifecycle;
pub use locks::{EntityLock, LockError, LockTable};
pub use machine::{Label, Machine};
pub use notifier::{AfterCommitOutcome, CommitNotifier};
pub use registry::{StateEntry, StateRegistry};
pub use store::{InMemorySubjectStore, StoreError, SubjectStore};
pub use subject::{FirstArrivals, FlagValue, Flags, Subject};
pub use table::{EventEntry, FromStates, GuardRef, Rule, TransitionTable};
