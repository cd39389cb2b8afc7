//! Job storage.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use super::types::{Job, JobId, JobKind, JobStatus};

/// Job store abstraction.
pub trait JobStore: Send + Sync {
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError>;

    fn get(&self, job_id: JobId) -> Result<Option<Job>, JobStoreError>;

    fn update(&self, job: &Job) -> Result<(), JobStoreError>;

    /// Claim the oldest claimable job of `kind`, marking it running.
    fn claim_next(&self, kind: &JobKind, now: DateTime<Utc>) -> Result<Option<Job>, JobStoreError>;

    /// Jobs of `kind`, oldest first.
    fn list_by_kind(&self, kind: &JobKind, limit: usize) -> Result<Vec<Job>, JobStoreError>;

    fn stats(&self) -> Result<JobStats, JobStoreError>;
}

impl<S> JobStore for Arc<S>
where
    S: JobStore + ?Sized,
{
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        (**self).enqueue(job)
    }

    fn get(&self, job_id: JobId) -> Result<Option<Job>, JobStoreError> {
        (**self).get(job_id)
    }

    fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        (**self).update(job)
    }

    fn claim_next(&self, kind: &JobKind, now: DateTime<Utc>) -> Result<Option<Job>, JobStoreError> {
        (**self).claim_next(kind, now)
    }

    fn list_by_kind(&self, kind: &JobKind, limit: usize) -> Result<Vec<Job>, JobStoreError> {
        (**self).list_by_kind(kind, limit)
    }

    fn stats(&self) -> Result<JobStats, JobStoreError> {
        (**self).stats()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct JobStats {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub dead_lettered: usize,
}

/// In-memory job store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

fn poisoned() -> JobStoreError {
    JobStoreError::Storage("lock poisoned".to_string())
}

impl JobStore for InMemoryJobStore {
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
        if jobs.contains_key(&job.id) {
            return Err(JobStoreError::AlreadyExists(job.id));
        }
        let id = job.id;
        jobs.insert(id, job);
        Ok(id)
    }

    fn get(&self, job_id: JobId) -> Result<Option<Job>, JobStoreError> {
        let jobs = self.jobs.read().map_err(|_| poisoned())?;
        Ok(jobs.get(&job_id).cloned())
    }

    fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
        match jobs.get_mut(&job.id) {
            Some(slot) => {
                *slot = job.clone();
                Ok(())
            }
            None => Err(JobStoreError::NotFound(job.id)),
        }
    }

    fn claim_next(&self, kind: &JobKind, now: DateTime<Utc>) -> Result<Option<Job>, JobStoreError> {
        let mut jobs = self.jobs.write().map_err(|_| poisoned())?;

        // Oldest first; ids are time-ordered and break ties.
        let next = jobs
            .values()
            .filter(|j| &j.kind == kind && j.is_claimable(now))
            .min_by_key(|j| (j.created_at, j.id))
            .map(|j| j.id);

        let Some(id) = next else {
            return Ok(None);
        };
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(None);
        };
        job.mark_running(now);
        Ok(Some(job.clone()))
    }

    fn list_by_kind(&self, kind: &JobKind, limit: usize) -> Result<Vec<Job>, JobStoreError> {
        let jobs = self.jobs.read().map_err(|_| poisoned())?;
        let mut result: Vec<_> = jobs.values().filter(|j| &j.kind == kind).cloned().collect();
        result.sort_by_key(|j| (j.created_at, j.id));
        result.truncate(limit);
        Ok(result)
    }

    fn stats(&self) -> Result<JobStats, JobStoreError> {
        let jobs = self.jobs.read().map_err(|_| poisoned())?;
        let mut stats = JobStats::default();
        for job in jobs.values() {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed { .. } => stats.failed += 1,
                JobStatus::DeadLettered { .. } => stats.dead_lettered += 1,
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_respects_schedule_and_order() {
        let store = InMemoryJobStore::new();
        let now = Utc::now();
        let later = Job::new(JobKind::RelistCheck, serde_json::json!({"n": 2}), now)
            .scheduled_at(now + chrono::Duration::minutes(5));
        let first = Job::new(JobKind::RelistCheck, serde_json::json!({"n": 1}), now);
        let first_id = store.enqueue(first).unwrap();
        store.enqueue(later).unwrap();

        let claimed = store.claim_next(&JobKind::RelistCheck, now).unwrap().unwrap();
        assert_eq!(claimed.id, first_id);
        assert_eq!(claimed.status, JobStatus::Running);

        assert!(store.claim_next(&JobKind::RelistCheck, now).unwrap().is_none());
        assert!(
            store
                .claim_next(&JobKind::RelistCheck, now + chrono::Duration::minutes(5))
                .unwrap()
                .is_some()
        );
        assert_eq!(store.stats().unwrap().running, 2);
    }

    #[test]
    fn claim_ignores_other_kinds() {
        let store = InMemoryJobStore::new();
        let now = Utc::now();
        store
            .enqueue(Job::new(JobKind::custom("reindex"), serde_json::json!({}), now))
            .unwrap();

        assert!(store.claim_next(&JobKind::RelistCheck, now).unwrap().is_none());
    }
}
