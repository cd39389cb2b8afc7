//! Runs due relist checks: each one fires `List` for its item.

use chrono::{DateTime, Utc};
use serde::Serialize;

use resale_items::{ItemEvent, ItemMachine, ItemServices, RelistCheck};
use resale_lifecycle::{Invocation, LifecycleEngine, SubjectStore};

use super::store::{JobStore, JobStoreError};
use super::types::{Job, JobKind};

/// Invocation source recorded on transitions made by the runner.
pub const RELIST_CHECK_SOURCE: &str = "relist_check";

/// What one [`RelistCheckRunner::run_due`] pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelistRunSummary {
    /// Items put back on sale.
    pub relisted: usize,
    /// Items whose state or flags no longer allow listing.
    pub skipped: usize,
    /// Attempts that failed and were rescheduled or dead-lettered.
    pub failed: usize,
}

pub struct RelistCheckRunner<'a, J, St> {
    jobs: &'a J,
    engine: &'a LifecycleEngine<ItemMachine, St>,
    services: &'a ItemServices,
}

impl<'a, J, St> RelistCheckRunner<'a, J, St>
where
    J: JobStore,
    St: SubjectStore<ItemMachine>,
{
    pub fn new(
        jobs: &'a J,
        engine: &'a LifecycleEngine<ItemMachine, St>,
        services: &'a ItemServices,
    ) -> Self {
        Self {
            jobs,
            engine,
            services,
        }
    }

    /// Claim and run every relist check due at `now`.
    ///
    /// A check whose item cannot be listed any more completes without a
    /// transition. Other failures go through the job's retry policy.
    pub fn run_due(&self, now: DateTime<Utc>) -> Result<RelistRunSummary, JobStoreError> {
        let mut summary = RelistRunSummary::default();

        while let Some(mut job) = self.jobs.claim_next(&JobKind::RelistCheck, now)? {
            self.run_one(&mut job, now, &mut summary);
            self.jobs.update(&job)?;
        }

        if summary != RelistRunSummary::default() {
            tracing::info!(
                relisted = summary.relisted,
                skipped = summary.skipped,
                failed = summary.failed,
                "relist checks processed"
            );
        }
        Ok(summary)
    }

    fn run_one(&self, job: &mut Job, now: DateTime<Utc>, summary: &mut RelistRunSummary) {
        let check: RelistCheck = match serde_json::from_value(job.payload.clone()) {
            Ok(check) => check,
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "malformed relist check payload");
                job.dead_letter(format!("malformed payload: {e}"), now);
                summary.failed += 1;
                return;
            }
        };

        let invocation = Invocation::new(ItemEvent::List).with_source(RELIST_CHECK_SOURCE);
        match self.engine.fire(check.item.into(), invocation, self.services) {
            Ok(fired) => {
                tracing::debug!(job_id = %job.id, item = %check.item, state = %fired.state(), "item relisted");
                job.mark_completed(now);
                summary.relisted += 1;
            }
            Err(e) if e.is_no_transition() => {
                tracing::debug!(job_id = %job.id, item = %check.item, "item no longer listable");
                job.mark_completed(now);
                summary.skipped += 1;
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %job.id,
                    item = %check.item,
                    attempt = job.attempt,
                    error = %e,
                    "relist check failed"
                );
                job.mark_failed(e.to_string(), now);
                if job.status.is_terminal() {
                    tracing::error!(
                        job_id = %job.id,
                        kind = job.kind.type_name(),
                        attempts = job.attempt,
                        "relist check dead-lettered"
                    );
                }
                summary.failed += 1;
            }
        }
    }
}
