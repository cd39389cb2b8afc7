//! The sellable-item lifecycle: states, events, collaborators and the rule
//! catalog wired into a `resale_lifecycle::Lifecycle`.

pub mod catalog;
pub mod event;
pub mod guards;
pub mod hooks;
pub mod in_memory;
pub mod item;
pub mod ports;
pub mod state;

pub use catalog::item_lifecycle;
pub use event::ItemEvent;
pub use in_memory::{
    FixedPricing, InMemoryBags, InMemoryCollaborators, InMemoryInventory, InMemoryReviews,
    PayoutEntry, RecordingJobQueue, RecordingPayouts,
};
pub use item::{Item, ItemData, ItemId, ItemMachine, ItemServices, flags};
pub use ports::{
    BagLookup, CollaboratorError, InventoryLookup, JobQueue, PayoutService, PriceQuote,
    PricingService, RelistCheck, ReviewLookup,
};
pub use state::ItemState;
