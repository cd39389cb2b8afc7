//! Failure taxonomy of a `fire` call.

use thiserror::Error;

use resale_core::EntityId;

use crate::hooks::Phase;
use crate::locks::LockError;
use crate::store::StoreError;

/// Boxed cause attached to guard and hook failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a transition did not happen.
///
/// Every variant means the entity is unchanged. A transition that committed
/// but whose after-commit hooks failed is an `Ok` result; see
/// [`crate::Fired::after_commit`].
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The event is not part of the lifecycle (configuration error).
    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    /// The state is not registered (configuration or data error).
    #[error("unknown state '{0}'")]
    UnknownState(String),

    #[error("entity not found: {0}")]
    NotFound(EntityId),

    /// No rule of the event accepts the current state, or every candidate
    /// guard said no.
    #[error("no transition for event '{event}' from state '{state}'")]
    NoApplicableTransition {
        event: &'static str,
        state: &'static str,
    },

    /// A guard predicate returned an error instead of a verdict.
    #[error("guard '{guard}' failed while evaluating event '{event}'")]
    GuardFailure {
        event: &'static str,
        guard: &'static str,
        source: BoxError,
    },

    /// A pre-commit hook failed; the transition was rolled back.
    #[error("{phase} hook '{hook}' failed during event '{event}'")]
    HookFailure {
        event: &'static str,
        phase: Phase,
        hook: &'static str,
        source: BoxError,
    },

    /// The write or commit failed; the transition was rolled back.
    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),

    #[error(transparent)]
    Lock(#[from] LockError),
}

impl LifecycleError {
    /// Registry misconfiguration or corrupt data; retrying will not help.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            LifecycleError::UnknownEvent(_) | LifecycleError::UnknownState(_)
        )
    }

    /// The event simply does not apply right now (often expected).
    pub fn is_no_transition(&self) -> bool {
        matches!(self, LifecycleError::NoApplicableTransition { .. })
    }

    /// Contention that may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LifecycleError::Lock(LockError::Timeout(_))
                | LifecycleError::Persistence(StoreError::Conflict(_))
        )
    }
}
