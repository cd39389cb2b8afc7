//! `JobQueue` port backed by a [`JobStore`].

use std::sync::Arc;

use resale_items::{CollaboratorError, JobQueue, RelistCheck};
use resale_lifecycle::{Clock, SystemClock};

use super::store::JobStore;
use super::types::{Job, JobKind, RetryPolicy};

/// Enqueues relist checks as [`JobKind::RelistCheck`] jobs scheduled at
/// their `not_before` instant.
pub struct JobStoreQueue<S> {
    store: S,
    retry_policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl<S: JobStore> JobStoreQueue<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            retry_policy: RetryPolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: JobStore> JobQueue for JobStoreQueue<S> {
    fn enqueue_relist_check(&self, check: RelistCheck) -> Result<(), CollaboratorError> {
        let payload = serde_json::to_value(&check)
            .map_err(|e| CollaboratorError::Rejected(format!("relist check payload: {e}")))?;

        let job = Job::new(JobKind::RelistCheck, payload, self.clock.now())
            .with_retry_policy(self.retry_policy.clone())
            .scheduled_at(check.not_before);

        let job_id = self
            .store
            .enqueue(job)
            .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;

        tracing::debug!(%job_id, item = %check.item, not_before = %check.not_before, "relist check enqueued");
        Ok(())
    }
}
