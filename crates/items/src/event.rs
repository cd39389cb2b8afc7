use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use resale_core::DomainError;
use resale_lifecycle::Label;

/// Operations callers may request on an item.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemEvent {
    Receive,
    MarkReady,
    List,
    RefreshListing,
    Delist,
    Reserve,
    Release,
    Purchase,
    Pack,
    Ship,
    Deliver,
    RequestReturn,
    ReceiveReturn,
    Restock,
    Flag,
    ClearReview,
    MarkLost,
    Found,
    Reclaim,
    Donate,
    Recycle,
}

impl Label for ItemEvent {
    fn name(&self) -> &'static str {
        match self {
            ItemEvent::Receive => "receive",
            ItemEvent::MarkReady => "mark_ready",
            ItemEvent::List => "list",
            ItemEvent::RefreshListing => "refresh_listing",
            ItemEvent::Delist => "delist",
            ItemEvent::Reserve => "reserve",
            ItemEvent::Release => "release",
            ItemEvent::Purchase => "purchase",
            ItemEvent::Pack => "pack",
            ItemEvent::Ship => "ship",
            ItemEvent::Deliver => "deliver",
            ItemEvent::RequestReturn => "request_return",
            ItemEvent::ReceiveReturn => "receive_return",
            ItemEvent::Restock => "restock",
            ItemEvent::Flag => "flag",
            ItemEvent::ClearReview => "clear_review",
            ItemEvent::MarkLost => "mark_lost",
            ItemEvent::Found => "found",
            ItemEvent::Reclaim => "reclaim",
            ItemEvent::Donate => "donate",
            ItemEvent::Recycle => "recycle",
        }
    }

    fn all() -> &'static [Self] {
        &[
            ItemEvent::Receive,
            ItemEvent::MarkReady,
            ItemEvent::List,
            ItemEvent::RefreshListing,
            ItemEvent::Delist,
            ItemEvent::Reserve,
            ItemEvent::Release,
            ItemEvent::Purchase,
            ItemEvent::Pack,
            ItemEvent::Ship,
            ItemEvent::Deliver,
            ItemEvent::RequestReturn,
            ItemEvent::ReceiveReturn,
            ItemEvent::Restock,
            ItemEvent::Flag,
            ItemEvent::ClearReview,
            ItemEvent::MarkLost,
            ItemEvent::Found,
            ItemEvent::Reclaim,
            ItemEvent::Donate,
            ItemEvent::Recycle,
        ]
    }
}

impl fmt::Display for ItemEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ItemEvent {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| DomainError::unknown_label("item event", s))
    }
}
