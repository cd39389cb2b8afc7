use core::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use resale_core::EntityId;
use resale_events::NotificationSink;
use resale_lifecycle::{Machine, Subject};

use crate::event::ItemEvent;
use crate::ports::{BagLookup, InventoryLookup, JobQueue, PayoutService, PricingService, ReviewLookup};
use crate::state::ItemState;

/// Public item identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub EntityId);

impl ItemId {
    pub fn new() -> Self {
        Self(EntityId::new())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<EntityId> for ItemId {
    fn from(id: EntityId) -> Self {
        Self(id)
    }
}

impl From<ItemId> for EntityId {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Flag keys read by item guards.
pub mod flags {
    /// Keeps an item off the shelves even when it is otherwise listable.
    pub const LISTING_HOLD: &str = "listing_hold";
    /// Listed through a partner channel only.
    pub const EXCLUSIVE: &str = "exclusive";
    /// Consignor asked for the item to be taken off sale.
    pub const DELIST_REQUESTED: &str = "delist_requested";
}

/// Item payload beyond lifecycle bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemData {
    pub sku: String,
    pub warehouse: String,
    /// Intake bag the item arrived in.
    pub bag: Option<String>,
    pub price_cents: Option<u64>,
    pub final_sale: bool,
    pub price_frozen: bool,
    pub order: Option<String>,
    pub reservation: Option<String>,
    pub reclaim_requested: bool,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl ItemData {
    pub fn new(sku: impl Into<String>, warehouse: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            warehouse: warehouse.into(),
            ..Self::default()
        }
    }

    pub fn with_bag(mut self, bag: impl Into<String>) -> Self {
        self.bag = Some(bag.into());
        self
    }

    pub fn with_price(mut self, price_cents: u64) -> Self {
        self.price_cents = Some(price_cents);
        self
    }
}

/// Collaborators injected into every item transition.
#[derive(Clone)]
pub struct ItemServices {
    pub inventory: Arc<dyn InventoryLookup>,
    pub bags: Arc<dyn BagLookup>,
    pub reviews: Arc<dyn ReviewLookup>,
    pub pricing: Arc<dyn PricingService>,
    pub payouts: Arc<dyn PayoutService>,
    pub notifications: Arc<dyn NotificationSink>,
    pub jobs: Arc<dyn JobQueue>,
    /// Wait before a relist check may run.
    pub relist_check_delay: Duration,
    /// How long after delivery a return may be requested.
    pub return_window: Duration,
}

impl fmt::Debug for ItemServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemServices")
            .field("relist_check_delay", &self.relist_check_delay)
            .field("return_window", &self.return_window)
            .finish_non_exhaustive()
    }
}

pub struct ItemMachine;

impl Machine for ItemMachine {
    type State = ItemState;
    type Event = ItemEvent;
    type Data = ItemData;
    type Services = ItemServices;

    const ENTITY_TYPE: &'static str = "item";
}

pub type Item = Subject<ItemMachine>;

pub(crate) fn item_id(item: &Item) -> ItemId {
    ItemId(item.id())
}
