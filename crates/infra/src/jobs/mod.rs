//! Background jobs with retry, backoff and dead-lettering.
//!
//! - `Job`: kind, JSON payload, schedule and attempt bookkeeping
//! - `JobStore`: persistence and claiming of due jobs
//! - `JobStoreQueue`: the item lifecycle's `JobQueue` port backed by a store
//! - `RelistCheckRunner`: drains due relist checks through the engine

pub mod queue;
pub mod relist;
pub mod store;
pub mod types;

pub use queue::JobStoreQueue;
pub use relist::{RELIST_CHECK_SOURCE, RelistCheckRunner, RelistRunSummary};
pub use store::{InMemoryJobStore, JobStats, JobStore, JobStoreError};
pub use types::{BackoffStrategy, Job, JobId, JobKind, JobStatus, RetryPolicy};
