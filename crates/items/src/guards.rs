//! Guard predicates of the item lifecycle.
//!
//! Read-only: they consult the item and its collaborators and never write.
//! A collaborator error surfaces as the guard's error, which fails the whole
//! `fire` call instead of counting as `false`.

use resale_lifecycle::HookContext;

use crate::item::{Item, ItemMachine, flags, item_id};

type Ctx<'a> = HookContext<'a, ItemMachine>;

pub fn bag_processed(item: &Item, ctx: &Ctx<'_>) -> anyhow::Result<bool> {
    match item.data().bag.as_deref() {
        Some(bag) => Ok(ctx.services.bags.is_processed(bag)?),
        None => Ok(false),
    }
}

pub fn bought_out(item: &Item, ctx: &Ctx<'_>) -> anyhow::Result<bool> {
    match item.data().bag.as_deref() {
        Some(bag) => Ok(ctx.services.bags.is_bought_out(bag)?),
        None => Ok(false),
    }
}

/// Priced and therefore ready for the listing queue.
pub fn listable(item: &Item, _ctx: &Ctx<'_>) -> anyhow::Result<bool> {
    Ok(item.data().price_cents.is_some())
}

pub fn should_list(item: &Item, _ctx: &Ctx<'_>) -> anyhow::Result<bool> {
    Ok(!item.flags().is_set(flags::LISTING_HOLD))
}

pub fn exclusive(item: &Item, _ctx: &Ctx<'_>) -> anyhow::Result<bool> {
    Ok(item.flags().is_set(flags::EXCLUSIVE))
}

pub fn should_delist(item: &Item, _ctx: &Ctx<'_>) -> anyhow::Result<bool> {
    Ok(item.flags().is_set(flags::DELIST_REQUESTED))
}

pub fn should_reclaim(item: &Item, _ctx: &Ctx<'_>) -> anyhow::Result<bool> {
    Ok(item.data().reclaim_requested)
}

pub fn flagged(item: &Item, ctx: &Ctx<'_>) -> anyhow::Result<bool> {
    Ok(ctx.services.reviews.is_flagged(item_id(item))?)
}

pub fn misplaced(item: &Item, ctx: &Ctx<'_>) -> anyhow::Result<bool> {
    Ok(ctx.services.inventory.is_lost(item_id(item))?)
}

pub fn open_slot(item: &Item, ctx: &Ctx<'_>) -> anyhow::Result<bool> {
    let data = item.data();
    Ok(ctx
        .services
        .inventory
        .open_slot_exists(&data.sku, &data.warehouse)?)
}

pub fn within_return_window(item: &Item, ctx: &Ctx<'_>) -> anyhow::Result<bool> {
    Ok(item
        .data()
        .delivered_at
        .is_some_and(|at| ctx.now - at <= ctx.services.return_window))
}
