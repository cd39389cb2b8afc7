//! Persistence boundary for lifecycle-managed entities.
//!
//! A commit writes the entity row and its history record together: either
//! both become visible or neither does. The per-entity lock also lives here,
//! so engines sharing a store serialize against each other.

pub mod in_memory;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use resale_core::{EntityId, ExpectedVersion};

use crate::audit::HistoryRecord;
use crate::locks::{EntityLock, LockError};
use crate::machine::Machine;
use crate::subject::Subject;

pub use in_memory::InMemorySubjectStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("entity already exists: {0}")]
    AlreadyExists(EntityId),

    #[error("entity not found: {0}")]
    NotFound(EntityId),

    /// Optimistic concurrency check failed.
    #[error("version conflict: {0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

pub trait SubjectStore<M: Machine>: Send + Sync {
    fn insert(&self, subject: &Subject<M>) -> Result<(), StoreError>;

    fn load(&self, id: EntityId) -> Result<Option<Subject<M>>, StoreError>;

    /// Hold `id` exclusively until the guard drops, waiting at most `timeout`
    /// (`None` waits indefinitely).
    fn lock(&self, id: EntityId, timeout: Option<Duration>) -> Result<EntityLock, LockError>;

    /// Atomically replace the row and append `record`, provided the stored
    /// version satisfies `expected`.
    fn commit(
        &self,
        subject: &Subject<M>,
        record: HistoryRecord<M::State>,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError>;

    /// History records for `id`, in insertion order.
    fn history(&self, id: EntityId) -> Result<Vec<HistoryRecord<M::State>>, StoreError>;
}

impl<M, S> SubjectStore<M> for Arc<S>
where
    M: Machine,
    S: SubjectStore<M> + ?Sized,
{
    fn insert(&self, subject: &Subject<M>) -> Result<(), StoreError> {
        (**self).insert(subject)
    }

    fn load(&self, id: EntityId) -> Result<Option<Subject<M>>, StoreError> {
        (**self).load(id)
    }

    fn lock(&self, id: EntityId, timeout: Option<Duration>) -> Result<EntityLock, LockError> {
        (**self).lock(id, timeout)
    }

    fn commit(
        &self,
        subject: &Subject<M>,
        record: HistoryRecord<M::State>,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError> {
        (**self).commit(subject, record, expected)
    }

    fn history(&self, id: EntityId) -> Result<Vec<HistoryRecord<M::State>>, StoreError> {
        (**self).history(id)
    }
}
