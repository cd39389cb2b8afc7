use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use resale_core::DomainError;
use resale_lifecycle::Label;

/// Lifecycle stage of a sellable item.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Drafted,
    Stockroom,
    ReadyToList,
    Listed,
    PartnerListed,
    ConsignmentDelisted,
    Reserved,
    Purchased,
    Packed,
    Shipped,
    Delivered,
    ReturnRequested,
    Returned,
    UnderReview,
    Lost,
    Reclaimable,
    Reclaimed,
    Donated,
    Recycled,
}

impl ItemState {
    /// States the item never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemState::Reclaimed | ItemState::Donated | ItemState::Recycled
        )
    }

    /// States the `list` event accepts.
    pub fn awaits_listing(&self) -> bool {
        matches!(self, ItemState::ReadyToList | ItemState::ConsignmentDelisted)
    }
}

impl Label for ItemState {
    fn name(&self) -> &'static str {
        match self {
            ItemState::Drafted => "drafted",
            ItemState::Stockroom => "stockroom",
            ItemState::ReadyToList => "ready_to_list",
            ItemState::Listed => "listed",
            ItemState::PartnerListed => "partner_listed",
            ItemState::ConsignmentDelisted => "consignment_delisted",
            ItemState::Reserved => "reserved",
            ItemState::Purchased => "purchased",
            ItemState::Packed => "packed",
            ItemState::Shipped => "shipped",
            ItemState::Delivered => "delivered",
            ItemState::ReturnRequested => "return_requested",
            ItemState::Returned => "returned",
            ItemState::UnderReview => "under_review",
            ItemState::Lost => "lost",
            ItemState::Reclaimable => "reclaimable",
            ItemState::Reclaimed => "reclaimed",
            ItemState::Donated => "donated",
            ItemState::Recycled => "recycled",
        }
    }

    fn all() -> &'static [Self] {
        &[
            ItemState::Drafted,
            ItemState::Stockroom,
            ItemState::ReadyToList,
            ItemState::Listed,
            ItemState::PartnerListed,
            ItemState::ConsignmentDelisted,
            ItemState::Reserved,
            ItemState::Purchased,
            ItemState::Packed,
            ItemState::Shipped,
            ItemState::Delivered,
            ItemState::ReturnRequested,
            ItemState::Returned,
            ItemState::UnderReview,
            ItemState::Lost,
            ItemState::Reclaimable,
            ItemState::Reclaimed,
            ItemState::Donated,
            ItemState::Recycled,
        ]
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ItemState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| DomainError::unknown_label("item state", s))
    }
}
