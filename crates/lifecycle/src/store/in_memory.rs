use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use resale_core::{EntityId, ExpectedVersion};

use super::{StoreError, SubjectStore};
use crate::audit::HistoryRecord;
use crate::locks::{EntityLock, LockError, LockTable};
use crate::machine::Machine;
use crate::subject::Subject;

struct Tables<M: Machine> {
    rows: HashMap<EntityId, Subject<M>>,
    history: HashMap<EntityId, Vec<HistoryRecord<M::State>>>,
}

/// In-memory entity store.
///
/// Intended for tests/dev. Rows and history live behind one lock, so a commit
/// is all-or-nothing. Entity locks are tracked separately and held across a
/// whole transition.
pub struct InMemorySubjectStore<M: Machine> {
    tables: RwLock<Tables<M>>,
    locks: LockTable,
}

impl<M: Machine> Default for InMemorySubjectStore<M> {
    fn default() -> Self {
        Self {
            tables: RwLock::new(Tables {
                rows: HashMap::new(),
                history: HashMap::new(),
            }),
            locks: LockTable::new(),
        }
    }
}

impl<M: Machine> InMemorySubjectStore<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tables.read().map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Storage("lock poisoned".to_string())
}

impl<M: Machine> SubjectStore<M> for InMemorySubjectStore<M> {
    fn insert(&self, subject: &Subject<M>) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        if tables.rows.contains_key(&subject.id()) {
            return Err(StoreError::AlreadyExists(subject.id()));
        }
        tables.rows.insert(subject.id(), subject.clone());
        Ok(())
    }

    fn load(&self, id: EntityId) -> Result<Option<Subject<M>>, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.rows.get(&id).cloned())
    }

    fn lock(&self, id: EntityId, timeout: Option<Duration>) -> Result<EntityLock, LockError> {
        self.locks.acquire(id, timeout)
    }

    fn commit(
        &self,
        subject: &Subject<M>,
        record: HistoryRecord<M::State>,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let current = tables
            .rows
            .get(&subject.id())
            .map(Subject::version)
            .ok_or(StoreError::NotFound(subject.id()))?;

        expected
            .check(current)
            .map_err(|e| StoreError::Conflict(e.to_string()))?;

        tables.rows.insert(subject.id(), subject.clone());
        tables.history.entry(subject.id()).or_default().push(record);
        Ok(())
    }

    fn history(&self, id: EntityId) -> Result<Vec<HistoryRecord<M::State>>, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.history.get(&id).cloned().unwrap_or_default())
    }
}
