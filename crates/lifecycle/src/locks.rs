//! Per-entity mutual exclusion for the duration of a transition.
//!
//! One slot per locked entity, created on first use and pruned once nobody
//! holds or waits on it. Stores hand these out through
//! [`crate::SubjectStore::lock`], so every engine sharing a store also shares
//! its locks.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use thiserror::Error;

use resale_core::EntityId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("timed out waiting for lock on entity {0}")]
    Timeout(EntityId),

    #[error("lock table poisoned")]
    Poisoned,
}

#[derive(Debug, Default)]
struct Slot {
    held: Mutex<bool>,
    released: Condvar,
}

impl Slot {
    fn wait_until_free(&self, id: EntityId, deadline: Option<Instant>) -> Result<(), LockError> {
        let mut held = self.held.lock().map_err(|_| LockError::Poisoned)?;

        while *held {
            held = match deadline {
                None => self.released.wait(held).map_err(|_| LockError::Poisoned)?,
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(LockError::Timeout(id));
                    }
                    let (guard, _) = self
                        .released
                        .wait_timeout(held, remaining)
                        .map_err(|_| LockError::Poisoned)?;
                    guard
                }
            };
        }

        *held = true;
        Ok(())
    }
}

type Slots = DashMap<EntityId, Arc<Slot>>;

/// Currently locked entities. Cloning shares the table.
#[derive(Debug, Clone, Default)]
pub struct LockTable {
    slots: Arc<Slots>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `id` is free, then hold it until the guard drops.
    pub fn acquire(&self, id: EntityId, timeout: Option<Duration>) -> Result<EntityLock, LockError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let slot = self.slot(id);

        if let Err(err) = slot.wait_until_free(id, deadline) {
            drop(slot);
            prune(&self.slots, id, 1);
            return Err(err);
        }

        Ok(EntityLock {
            id,
            slot,
            slots: Arc::clone(&self.slots),
        })
    }

    pub fn is_locked(&self, id: EntityId) -> bool {
        self.slots
            .get(&id)
            .map(|slot| slot.held.lock().map(|held| *held).unwrap_or(false))
            .unwrap_or(false)
    }

    /// Entities with a live slot (held or awaited).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, id: EntityId) -> Arc<Slot> {
        self.slots.entry(id).or_default().clone()
    }
}

/// Drop the slot for `id` if only `owners` references remain.
///
/// The check runs under the shard lock, which is also held while a new
/// waiter clones the slot, so a waiter is never orphaned.
fn prune(slots: &Slots, id: EntityId, owners: usize) {
    slots.remove_if(&id, |_, slot| Arc::strong_count(slot) <= owners);
}

/// Held lock on one entity; released on drop.
#[derive(Debug)]
pub struct EntityLock {
    id: EntityId,
    slot: Arc<Slot>,
    slots: Arc<Slots>,
}

impl EntityLock {
    pub fn entity_id(&self) -> EntityId {
        self.id
    }
}

impl Drop for EntityLock {
    fn drop(&mut self) {
        let mut held = self
            .slot
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *held = false;
        drop(held);
        self.slot.released.notify_all();

        // The table and this guard.
        prune(&self.slots, self.id, 2);
    }
}
