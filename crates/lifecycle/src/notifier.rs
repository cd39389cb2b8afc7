//! After-commit hook runner.
//!
//! Runs strictly after the commit succeeded and the entity lock is released.
//! Each hook is isolated: an error or panic is reported to the error sink and
//! recorded in the outcome list, and the remaining hooks still run.

use std::panic::{self, AssertUnwindSafe};

use resale_observability::{ErrorReport, ErrorSink};

use crate::engine::Committed;
use crate::hooks::{AfterCommitFn, Named};
use crate::machine::Machine;

/// Result of one after-commit hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AfterCommitOutcome {
    pub hook: &'static str,
    /// `None` when the hook succeeded.
    pub error: Option<String>,
}

impl AfterCommitOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct CommitNotifier<'a> {
    errors: &'a dyn ErrorSink,
    catch_panics: bool,
}

impl<'a> CommitNotifier<'a> {
    pub fn new(errors: &'a dyn ErrorSink, catch_panics: bool) -> Self {
        Self {
            errors,
            catch_panics,
        }
    }

    pub(crate) fn notify<M: Machine>(
        &self,
        hooks: &[Named<AfterCommitFn<M>>],
        committed: &Committed<M>,
        services: &M::Services,
    ) -> Vec<AfterCommitOutcome> {
        hooks
            .iter()
            .map(|hook| {
                let result = if self.catch_panics {
                    panic::catch_unwind(AssertUnwindSafe(|| (hook.f)(committed, services)))
                        .unwrap_or_else(|payload| {
                            Err(anyhow::anyhow!("panicked: {}", panic_message(&*payload)))
                        })
                } else {
                    (hook.f)(committed, services)
                };

                match result {
                    Ok(()) => {
                        tracing::debug!(hook = hook.name, "after-commit hook completed");
                        AfterCommitOutcome {
                            hook: hook.name,
                            error: None,
                        }
                    }
                    Err(err) => {
                        let message = format!("{err:#}");
                        self.errors.report(ErrorReport {
                            component: format!("after_commit:{}", hook.name),
                            subject: Some(committed.subject.id().to_string()),
                            message: message.clone(),
                        });
                        AfterCommitOutcome {
                            hook: hook.name,
                            error: Some(message),
                        }
                    }
                }
            })
            .collect()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
