//! In-memory collaborators for tests and local development.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Duration;

use resale_events::RecordingNotificationSink;

use crate::item::{ItemId, ItemServices};
use crate::ports::{
    BagLookup, CollaboratorError, InventoryLookup, JobQueue, PayoutService, PriceQuote,
    PricingService, RelistCheck, ReviewLookup,
};

fn poisoned() -> CollaboratorError {
    CollaboratorError::Unavailable("lock poisoned".to_string())
}

#[derive(Debug, Default)]
pub struct InMemoryInventory {
    lost: RwLock<HashSet<ItemId>>,
    open_slots: RwLock<HashSet<(String, String)>>,
    offline: AtomicBool,
}

impl InMemoryInventory {
    pub fn mark_lost(&self, item: ItemId) {
        if let Ok(mut lost) = self.lost.write() {
            lost.insert(item);
        }
    }

    pub fn mark_found(&self, item: ItemId) {
        if let Ok(mut lost) = self.lost.write() {
            lost.remove(&item);
        }
    }

    pub fn open_slot(&self, sku: &str, warehouse: &str) {
        if let Ok(mut slots) = self.open_slots.write() {
            slots.insert((sku.to_string(), warehouse.to_string()));
        }
    }

    /// Make every lookup fail, as a network partition would.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), CollaboratorError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable("inventory offline".to_string()));
        }
        Ok(())
    }
}

impl InventoryLookup for InMemoryInventory {
    fn is_lost(&self, item: ItemId) -> Result<bool, CollaboratorError> {
        self.check_online()?;
        Ok(self.lost.read().map_err(|_| poisoned())?.contains(&item))
    }

    fn open_slot_exists(&self, sku: &str, warehouse: &str) -> Result<bool, CollaboratorError> {
        self.check_online()?;
        let slots = self.open_slots.read().map_err(|_| poisoned())?;
        Ok(slots.contains(&(sku.to_string(), warehouse.to_string())))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBags {
    processed: RwLock<HashSet<String>>,
    bought_out: RwLock<HashSet<String>>,
}

impl InMemoryBags {
    pub fn mark_processed(&self, bag: &str) {
        if let Ok(mut processed) = self.processed.write() {
            processed.insert(bag.to_string());
        }
    }

    pub fn mark_bought_out(&self, bag: &str) {
        if let Ok(mut bought_out) = self.bought_out.write() {
            bought_out.insert(bag.to_string());
        }
    }
}

impl BagLookup for InMemoryBags {
    fn is_processed(&self, bag: &str) -> Result<bool, CollaboratorError> {
        Ok(self.processed.read().map_err(|_| poisoned())?.contains(bag))
    }

    fn is_bought_out(&self, bag: &str) -> Result<bool, CollaboratorError> {
        Ok(self.bought_out.read().map_err(|_| poisoned())?.contains(bag))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryReviews {
    flagged: RwLock<HashSet<ItemId>>,
}

impl InMemoryReviews {
    pub fn flag(&self, item: ItemId) {
        if let Ok(mut flagged) = self.flagged.write() {
            flagged.insert(item);
        }
    }

    pub fn clear(&self, item: ItemId) {
        if let Ok(mut flagged) = self.flagged.write() {
            flagged.remove(&item);
        }
    }
}

impl ReviewLookup for InMemoryReviews {
    fn is_flagged(&self, item: ItemId) -> Result<bool, CollaboratorError> {
        Ok(self.flagged.read().map_err(|_| poisoned())?.contains(&item))
    }
}

/// Quotes one fixed price for everything.
#[derive(Debug)]
pub struct FixedPricing {
    quote: Mutex<PriceQuote>,
    frozen: Mutex<Vec<(ItemId, u64)>>,
    rejecting: AtomicBool,
}

impl FixedPricing {
    pub fn new(price_cents: u64) -> Self {
        Self {
            quote: Mutex::new(PriceQuote {
                price_cents,
                final_sale: false,
            }),
            frozen: Mutex::new(Vec::new()),
            rejecting: AtomicBool::new(false),
        }
    }

    pub fn set_quote(&self, quote: PriceQuote) {
        if let Ok(mut current) = self.quote.lock() {
            *current = quote;
        }
    }

    /// Reject every request until switched back.
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    pub fn frozen(&self) -> Vec<(ItemId, u64)> {
        self.frozen.lock().map(|f| f.clone()).unwrap_or_default()
    }

    fn check(&self) -> Result<(), CollaboratorError> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Rejected("pricing disabled".to_string()));
        }
        Ok(())
    }
}

impl PricingService for FixedPricing {
    fn recalculate(&self, _item: ItemId, _sku: &str) -> Result<PriceQuote, CollaboratorError> {
        self.check()?;
        Ok(*self.quote.lock().map_err(|_| poisoned())?)
    }

    fn freeze(&self, item: ItemId, price_cents: u64) -> Result<(), CollaboratorError> {
        self.check()?;
        self.frozen
            .lock()
            .map_err(|_| poisoned())?
            .push((item, price_cents));
        Ok(())
    }
}

/// One payout ledger line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutEntry {
    Recorded {
        item: ItemId,
        order: String,
        amount_cents: u64,
    },
    Reversed {
        item: ItemId,
        order: String,
    },
}

#[derive(Debug, Default)]
pub struct RecordingPayouts {
    entries: Mutex<Vec<PayoutEntry>>,
    rejecting: AtomicBool,
}

impl RecordingPayouts {
    pub fn entries(&self) -> Vec<PayoutEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    fn push(&self, entry: PayoutEntry) -> Result<(), CollaboratorError> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Rejected("payout ledger closed".to_string()));
        }
        self.entries.lock().map_err(|_| poisoned())?.push(entry);
        Ok(())
    }
}

impl PayoutService for RecordingPayouts {
    fn record(&self, item: ItemId, order: &str, amount_cents: u64) -> Result<(), CollaboratorError> {
        self.push(PayoutEntry::Recorded {
            item,
            order: order.to_string(),
            amount_cents,
        })
    }

    fn reverse(&self, item: ItemId, order: &str) -> Result<(), CollaboratorError> {
        self.push(PayoutEntry::Reversed {
            item,
            order: order.to_string(),
        })
    }
}

#[derive(Debug, Default)]
pub struct RecordingJobQueue {
    checks: Mutex<Vec<RelistCheck>>,
    offline: AtomicBool,
}

impl RecordingJobQueue {
    pub fn checks(&self) -> Vec<RelistCheck> {
        self.checks.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

impl JobQueue for RecordingJobQueue {
    fn enqueue_relist_check(&self, check: RelistCheck) -> Result<(), CollaboratorError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable("job queue offline".to_string()));
        }
        self.checks.lock().map_err(|_| poisoned())?.push(check);
        Ok(())
    }
}

/// One of each in-memory collaborator, kept addressable so tests can steer
/// them after building [`ItemServices`].
#[derive(Debug, Clone)]
pub struct InMemoryCollaborators {
    pub inventory: Arc<InMemoryInventory>,
    pub bags: Arc<InMemoryBags>,
    pub reviews: Arc<InMemoryReviews>,
    pub pricing: Arc<FixedPricing>,
    pub payouts: Arc<RecordingPayouts>,
    pub notifications: Arc<RecordingNotificationSink>,
    pub jobs: Arc<RecordingJobQueue>,
}

impl Default for InMemoryCollaborators {
    fn default() -> Self {
        Self {
            inventory: Arc::default(),
            bags: Arc::default(),
            reviews: Arc::default(),
            pricing: Arc::new(FixedPricing::new(2_500)),
            payouts: Arc::default(),
            notifications: Arc::default(),
            jobs: Arc::default(),
        }
    }
}

impl InMemoryCollaborators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Services backed by these collaborators, with a one-day relist delay
    /// and a thirty-day return window.
    pub fn services(&self) -> ItemServices {
        ItemServices {
            inventory: self.inventory.clone(),
            bags: self.bags.clone(),
            reviews: self.reviews.clone(),
            pricing: self.pricing.clone(),
            payouts: self.payouts.clone(),
            notifications: self.notifications.clone(),
            jobs: self.jobs.clone(),
            relist_check_delay: Duration::days(1),
            return_window: Duration::days(30),
        }
    }
}
