//! Collaborators the item lifecycle consults or commands.
//!
//! Lookups are read-only and may be stale; commands run inside the
//! transition and their failures roll it back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::item::ItemId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("collaborator rejected request: {0}")]
    Rejected(String),
}

pub trait InventoryLookup: Send + Sync {
    /// Inventory has given up looking for the item.
    fn is_lost(&self, item: ItemId) -> Result<bool, CollaboratorError>;

    /// A free storage slot exists for this SKU in the warehouse.
    fn open_slot_exists(&self, sku: &str, warehouse: &str) -> Result<bool, CollaboratorError>;
}

pub trait BagLookup: Send + Sync {
    /// Intake finished processing the bag the item arrived in.
    fn is_processed(&self, bag: &str) -> Result<bool, CollaboratorError>;

    /// The consignor paid to have the bag's items returned.
    fn is_bought_out(&self, bag: &str) -> Result<bool, CollaboratorError>;
}

pub trait ReviewLookup: Send + Sync {
    fn is_flagged(&self, item: ItemId) -> Result<bool, CollaboratorError>;
}

/// Price and final-sale decision for one item.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price_cents: u64,
    pub final_sale: bool,
}

pub trait PricingService: Send + Sync {
    fn recalculate(&self, item: ItemId, sku: &str) -> Result<PriceQuote, CollaboratorError>;

    /// Lock the current price so later recalculations leave it alone.
    fn freeze(&self, item: ItemId, price_cents: u64) -> Result<(), CollaboratorError>;
}

pub trait PayoutService: Send + Sync {
    fn record(&self, item: ItemId, order: &str, amount_cents: u64) -> Result<(), CollaboratorError>;

    fn reverse(&self, item: ItemId, order: &str) -> Result<(), CollaboratorError>;
}

/// Delayed check whether a delisted item should go back on sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelistCheck {
    pub item: ItemId,
    pub not_before: DateTime<Utc>,
}

/// Fire-and-forget background work.
pub trait JobQueue: Send + Sync {
    fn enqueue_relist_check(&self, check: RelistCheck) -> Result<(), CollaboratorError>;
}
