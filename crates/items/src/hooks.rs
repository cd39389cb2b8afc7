//! Side effects attached to item states, events and rules.

use anyhow::{Context, bail};

use resale_lifecycle::{Committed, HookContext};

use crate::item::{Item, ItemMachine, ItemServices, item_id};
use crate::ports::RelistCheck;

type Ctx<'a> = HookContext<'a, ItemMachine>;

/// Invocation parameter carrying the order a purchase belongs to.
pub const ORDER_PARAM: &str = "order_id";
/// Invocation parameter carrying the cart reservation.
pub const RESERVATION_PARAM: &str = "reservation_id";

pub fn recalculate_price(item: &mut Item, ctx: &Ctx<'_>) -> anyhow::Result<()> {
    if item.data().price_frozen {
        return Ok(());
    }
    let quote = ctx
        .services
        .pricing
        .recalculate(item_id(item), &item.data().sku)?;
    let data = item.data_mut();
    data.price_cents = Some(quote.price_cents);
    data.final_sale = quote.final_sale;
    Ok(())
}

/// Pin the sale price on the item. The pricing service hears about it after
/// commit, from [`confirm_price_freeze`].
pub fn freeze_price(item: &mut Item, _ctx: &Ctx<'_>) -> anyhow::Result<()> {
    if item.data().price_cents.is_none() {
        bail!("cannot freeze the price of an unpriced item");
    }
    item.data_mut().price_frozen = true;
    Ok(())
}

pub fn unfreeze_price(item: &mut Item, _ctx: &Ctx<'_>) -> anyhow::Result<()> {
    item.data_mut().price_frozen = false;
    Ok(())
}

pub fn confirm_price_freeze(
    committed: &Committed<ItemMachine>,
    services: &ItemServices,
) -> anyhow::Result<()> {
    let item = &committed.subject;
    let price = item
        .data()
        .price_cents
        .context("purchased item has no price")?;
    services
        .pricing
        .freeze(item_id(item), price)
        .context("freezing price")
}

pub fn record_payout(
    committed: &Committed<ItemMachine>,
    services: &ItemServices,
) -> anyhow::Result<()> {
    let item = &committed.subject;
    let order = item
        .data()
        .order
        .as_deref()
        .context("purchased item has no order")?;
    let amount = item.data().price_cents.unwrap_or_default();
    services
        .payouts
        .record(item_id(item), order, amount)
        .context("recording payout")
}

pub fn reverse_payout(
    committed: &Committed<ItemMachine>,
    services: &ItemServices,
) -> anyhow::Result<()> {
    let item = &committed.subject;
    match item.data().order.as_deref() {
        Some(order) => services
            .payouts
            .reverse(item_id(item), order)
            .context("reversing payout"),
        None => Ok(()),
    }
}

pub fn record_delivery(item: &mut Item, ctx: &Ctx<'_>) -> anyhow::Result<()> {
    item.data_mut().delivered_at = Some(ctx.now);
    Ok(())
}

pub fn require_order(_item: &mut Item, ctx: &Ctx<'_>) -> anyhow::Result<()> {
    match ctx.invocation.param_str(ORDER_PARAM) {
        Some(order) if !order.is_empty() => Ok(()),
        _ => bail!("purchase requires the '{ORDER_PARAM}' parameter"),
    }
}

pub fn capture_order(item: &mut Item, ctx: &Ctx<'_>) -> anyhow::Result<()> {
    item.data_mut().order = ctx.invocation.param_str(ORDER_PARAM).map(str::to_string);
    item.data_mut().reservation = None;
    Ok(())
}

pub fn capture_reservation(item: &mut Item, ctx: &Ctx<'_>) -> anyhow::Result<()> {
    item.data_mut().reservation = ctx
        .invocation
        .param_str(RESERVATION_PARAM)
        .map(str::to_string);
    Ok(())
}

pub fn clear_reservation(item: &mut Item, _ctx: &Ctx<'_>) -> anyhow::Result<()> {
    item.data_mut().reservation = None;
    Ok(())
}

pub fn clear_reclaim_request(item: &mut Item, _ctx: &Ctx<'_>) -> anyhow::Result<()> {
    item.data_mut().reclaim_requested = false;
    Ok(())
}

pub fn publish_state_change(
    committed: &Committed<ItemMachine>,
    services: &ItemServices,
) -> anyhow::Result<()> {
    services
        .notifications
        .publish(committed.state_changed())
        .context("publishing state change")
}

/// Queue a relist check when the item ended up somewhere `list` can pick it
/// up again.
pub fn schedule_relist_check(
    committed: &Committed<ItemMachine>,
    services: &ItemServices,
) -> anyhow::Result<()> {
    if !committed.to.awaits_listing() {
        return Ok(());
    }
    let check = RelistCheck {
        item: item_id(&committed.subject),
        not_before: committed.record.created_at + services.relist_check_delay,
    };
    tracing::debug!(item = %check.item, not_before = %check.not_before, "scheduling relist check");
    services
        .jobs
        .enqueue_relist_check(check)
        .context("enqueueing relist check")
}
