//! The item rule catalog.

use resale_lifecycle::{BuildError, Lifecycle, LifecycleBuilder, Rule};

use crate::item::ItemMachine;
use crate::state::ItemState;
use crate::{guards, hooks};

use crate::event::ItemEvent as E;
use crate::state::ItemState as S;

const PUBLISH: &str = "publish_state_change";
const RELIST_CHECK: &str = "schedule_relist_check";
const CONFIRM_FREEZE: &str = "confirm_price_freeze";
const RECORD_PAYOUT: &str = "record_payout";
const REVERSE_PAYOUT: &str = "reverse_payout";

/// Every state from which an item can be pulled into review.
const REVIEWABLE: [ItemState; 7] = [
    S::Stockroom,
    S::ReadyToList,
    S::Listed,
    S::PartnerListed,
    S::ConsignmentDelisted,
    S::Reserved,
    S::Returned,
];

/// Every state in which inventory may lose track of an item.
const LOSABLE: [ItemState; 8] = [
    S::Stockroom,
    S::ReadyToList,
    S::Listed,
    S::PartnerListed,
    S::ConsignmentDelisted,
    S::Reserved,
    S::Packed,
    S::UnderReview,
];

fn registry() -> LifecycleBuilder<ItemMachine> {
    Lifecycle::<ItemMachine>::builder()
        .guard("bag_processed", guards::bag_processed)
        .guard("bought_out", guards::bought_out)
        .guard("listable", guards::listable)
        .guard("should_list", guards::should_list)
        .guard("exclusive", guards::exclusive)
        .guard("should_delist", guards::should_delist)
        .guard("should_reclaim", guards::should_reclaim)
        .guard("flagged", guards::flagged)
        .guard("misplaced", guards::misplaced)
        .guard("open_slot", guards::open_slot)
        .guard("within_return_window", guards::within_return_window)
        .hook("recalculate_price", hooks::recalculate_price)
        .hook("freeze_price", hooks::freeze_price)
        .hook("unfreeze_price", hooks::unfreeze_price)
        .hook("record_delivery", hooks::record_delivery)
        .hook("require_order", hooks::require_order)
        .hook("capture_order", hooks::capture_order)
        .hook("capture_reservation", hooks::capture_reservation)
        .hook("clear_reservation", hooks::clear_reservation)
        .hook("clear_reclaim_request", hooks::clear_reclaim_request)
        .after_commit_hook(PUBLISH, hooks::publish_state_change)
        .after_commit_hook(RELIST_CHECK, hooks::schedule_relist_check)
        .after_commit_hook(CONFIRM_FREEZE, hooks::confirm_price_freeze)
        .after_commit_hook(RECORD_PAYOUT, hooks::record_payout)
        .after_commit_hook(REVERSE_PAYOUT, hooks::reverse_payout)
}

fn states(builder: LifecycleBuilder<ItemMachine>) -> LifecycleBuilder<ItemMachine> {
    builder
        .states([
            S::Drafted,
            S::ReadyToList,
            S::ConsignmentDelisted,
            S::Reserved,
            S::Packed,
            S::Shipped,
            S::ReturnRequested,
            S::UnderReview,
            S::Lost,
            S::Reclaimable,
            S::Reclaimed,
            S::Donated,
            S::Recycled,
        ])
        .state(S::Stockroom, |s| s.stamp_first_arrival())
        .state(S::Listed, |s| {
            s.on_enter("recalculate_price").stamp_first_arrival()
        })
        .state(S::PartnerListed, |s| s.on_enter("recalculate_price"))
        .state(S::Purchased, |s| {
            s.before_enter("freeze_price").stamp_first_arrival()
        })
        .state(S::Delivered, |s| s.on_enter("record_delivery"))
        .state(S::Returned, |s| {
            s.on_enter("unfreeze_price").stamp_first_arrival()
        })
}

fn events(builder: LifecycleBuilder<ItemMachine>) -> LifecycleBuilder<ItemMachine> {
    builder
        .event(E::Receive, |e| {
            e.rule(Rule::new([S::Drafted], S::Stockroom).when("bag_processed"))
        })
        .event(E::MarkReady, |e| {
            e.rule(Rule::new([S::Stockroom], S::ReadyToList).when("listable"))
        })
        .event(E::List, |e| {
            let from = [S::ReadyToList, S::ConsignmentDelisted];
            e.rule(Rule::new(from, S::PartnerListed).when("exclusive"))
                .rule(Rule::new(from, S::Listed).when("should_list"))
        })
        .event(E::RefreshListing, |e| {
            e.transition([S::Listed], S::Listed)
                .transition([S::PartnerListed], S::PartnerListed)
        })
        .event(E::Delist, |e| {
            e.transition([S::Listed, S::PartnerListed], S::ConsignmentDelisted)
                .after_commit(RELIST_CHECK)
        })
        .event(E::Reserve, |e| {
            e.rule(
                Rule::new([S::Listed, S::PartnerListed], S::Reserved)
                    .unless("flagged")
                    .then("capture_reservation"),
            )
        })
        .event(E::Release, |e| {
            let from = [S::Reserved];
            e.rule(Rule::new(from, S::Lost).when("misplaced"))
                .rule(Rule::new(from, S::UnderReview).when("flagged"))
                .rule(Rule::new(from, S::Reclaimable).when("should_reclaim"))
                .rule(Rule::new(from, S::PartnerListed).when("exclusive"))
                .rule(Rule::new(from, S::ConsignmentDelisted).when("should_delist"))
                .rule(Rule::new(from, S::Listed).when("should_list"))
                .transition(from, S::Stockroom)
                .after("clear_reservation")
                .after_commit(RELIST_CHECK)
        })
        .event(E::Purchase, |e| {
            e.before("require_order").rule(
                Rule::new([S::Reserved, S::Listed, S::PartnerListed], S::Purchased)
                    .unless("flagged")
                    .then("capture_order"),
            )
            .after_commit(CONFIRM_FREEZE)
            .after_commit(RECORD_PAYOUT)
        })
        .event(E::Pack, |e| e.transition([S::Purchased], S::Packed))
        .event(E::Ship, |e| e.transition([S::Packed], S::Shipped))
        .event(E::Deliver, |e| e.transition([S::Shipped], S::Delivered))
        .event(E::RequestReturn, |e| {
            e.rule(Rule::new([S::Delivered], S::ReturnRequested).when("within_return_window"))
        })
        .event(E::ReceiveReturn, |e| {
            e.transition([S::ReturnRequested, S::Shipped], S::Returned)
                .after_commit(REVERSE_PAYOUT)
        })
        .event(E::Restock, |e| {
            let from = [S::Returned];
            e.rule(Rule::new(from, S::UnderReview).when("flagged"))
                .rule(Rule::new(from, S::Stockroom).when("open_slot"))
                .transition(from, S::Reclaimable)
        })
        .event(E::Flag, |e| e.transition(REVIEWABLE, S::UnderReview))
        .event(E::ClearReview, |e| {
            let from = [S::UnderReview];
            e.rule(Rule::new(from, S::Lost).when("misplaced"))
                .rule(Rule::new(from, S::Listed).when("should_list"))
                .transition(from, S::Stockroom)
        })
        .event(E::MarkLost, |e| e.rule(Rule::new(LOSABLE, S::Lost).when("misplaced")))
        .event(E::Found, |e| e.transition([S::Lost], S::Stockroom))
        .event(E::Reclaim, |e| {
            let from = [S::Reclaimable, S::ConsignmentDelisted];
            e.rule(Rule::new(from, S::Stockroom).when("bought_out"))
                .rule(Rule::new(from, S::Reclaimed).then("clear_reclaim_request"))
        })
        .event(E::Donate, |e| e.transition([S::Reclaimable], S::Donated))
        .event(E::Recycle, |e| {
            e.transition([S::Reclaimable, S::UnderReview], S::Recycled)
        })
}

/// Build the item lifecycle. Every event publishes a state-change notice
/// after commit.
pub fn item_lifecycle() -> Result<Lifecycle<ItemMachine>, BuildError> {
    events(states(registry()))
        .after_every_commit(PUBLISH)
        .build()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    use resale_core::EntityId;
    use resale_events::{NotificationSink, NotifyError, StateChanged};
    use std::time::Duration as StdDuration;

    use resale_core::ExpectedVersion;
    use resale_lifecycle::{
        EntityLock, HistoryRecord, InMemorySubjectStore, Invocation, Label, LifecycleEngine,
        LifecycleError, LockError, ManualClock, Phase, StoreError, Subject, SubjectStore,
    };
    use resale_observability::RecordingErrorSink;

    use super::*;
    use crate::event::ItemEvent;
    use crate::hooks::{ORDER_PARAM, RESERVATION_PARAM};
    use crate::in_memory::{InMemoryCollaborators, PayoutEntry};
    use crate::item::{ItemData, ItemId, ItemServices, flags};
    use crate::ports::PriceQuote;

    type Engine = LifecycleEngine<ItemMachine, InMemorySubjectStore<ItemMachine>>;

    struct Harness {
        engine: Engine,
        clock: Arc<ManualClock>,
        errors: Arc<RecordingErrorSink>,
        fakes: InMemoryCollaborators,
        services: ItemServices,
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, 8, 30, 0).unwrap()
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::new(t0()));
        let errors = Arc::new(RecordingErrorSink::new());
        let engine = LifecycleEngine::new(
            Arc::new(item_lifecycle().unwrap()),
            InMemorySubjectStore::new(),
        )
        .with_clock(clock.clone())
        .with_error_sink(errors.clone());
        let fakes = InMemoryCollaborators::new();
        let services = fakes.services();
        Harness {
            engine,
            clock,
            errors,
            fakes,
            services,
        }
    }

    impl Harness {
        fn seed(&self, state: ItemState, flags: &[&str]) -> ItemId {
            let data = ItemData::new("SKU-1", "WH-1")
                .with_bag("BAG-1")
                .with_price(1_000);
            let mut item = Subject::new(EntityId::new(), state, data);
            for flag in flags {
                item.flags_mut().set_bool(*flag, true);
            }
            self.engine.store().insert(&item).unwrap();
            ItemId(item.id())
        }

        fn fire(&self, item: ItemId, event: ItemEvent) -> Result<ItemState, LifecycleError> {
            self.fire_with(item, Invocation::new(event))
        }

        fn fire_with(
            &self,
            item: ItemId,
            invocation: Invocation<ItemEvent>,
        ) -> Result<ItemState, LifecycleError> {
            self.engine
                .fire(item.0, invocation, &self.services)
                .map(|fired| fired.state())
        }

        fn state(&self, item: ItemId) -> ItemState {
            self.engine.load(item.0).unwrap().state()
        }

        fn data(&self, item: ItemId) -> ItemData {
            self.engine.load(item.0).unwrap().data().clone()
        }
    }

    #[test]
    fn catalog_registers_every_state_and_event() {
        let lifecycle = item_lifecycle().unwrap();

        assert_eq!(lifecycle.states().len(), ItemState::all().len());
        assert_eq!(lifecycle.table().events(), ItemEvent::all());
        assert_eq!(
            lifecycle.states().stamped_states(),
            vec![
                ItemState::Stockroom,
                ItemState::Listed,
                ItemState::Purchased,
                ItemState::Returned
            ]
        );
        for entry in lifecycle.table().entries() {
            assert_eq!(entry.after_commit_hooks()[0], "publish_state_change");
        }
    }

    #[test]
    fn mark_ready_from_drafted_has_no_transition() {
        let h = harness();
        let item = h.seed(ItemState::Drafted, &[]);

        let err = h.fire(item, ItemEvent::MarkReady).unwrap_err();

        assert!(err.is_no_transition());
        assert_eq!(h.state(item), ItemState::Drafted);
        assert!(h.fakes.notifications.published().is_empty());
    }

    #[test]
    fn receive_waits_for_bag_processing() {
        let h = harness();
        let item = h.seed(ItemState::Drafted, &[]);

        assert!(h.fire(item, ItemEvent::Receive).unwrap_err().is_no_transition());

        h.fakes.bags.mark_processed("BAG-1");
        assert_eq!(h.fire(item, ItemEvent::Receive).unwrap(), ItemState::Stockroom);
        assert_eq!(
            h.engine.load(item.0).unwrap().first_arrival(ItemState::Stockroom),
            Some(t0())
        );
    }

    #[test]
    fn release_of_exclusive_item_goes_to_partner_listing() {
        let h = harness();
        let item = h.seed(ItemState::Reserved, &[flags::EXCLUSIVE, flags::DELIST_REQUESTED]);

        assert_eq!(h.fire(item, ItemEvent::Release).unwrap(), ItemState::PartnerListed);

        let data = h.data(item);
        assert_eq!(data.reservation, None);
        assert_eq!(data.price_cents, Some(2_500));
        let published = h.fakes.notifications.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event_kind, "release");
        assert_eq!(published[0].new_state, "partner_listed");
        assert!(h.fakes.jobs.checks().is_empty());
    }

    #[test]
    fn release_checks_misplaced_first() {
        let h = harness();
        let item = h.seed(ItemState::Reserved, &[flags::EXCLUSIVE]);
        h.fakes.inventory.mark_lost(item);
        h.fakes.reviews.flag(item);

        assert_eq!(h.fire(item, ItemEvent::Release).unwrap(), ItemState::Lost);
    }

    #[test]
    fn release_to_consignment_delisted_schedules_check() {
        let h = harness();
        let item = h.seed(ItemState::Reserved, &[flags::DELIST_REQUESTED]);

        assert_eq!(
            h.fire(item, ItemEvent::Release).unwrap(),
            ItemState::ConsignmentDelisted
        );

        let checks = h.fakes.jobs.checks();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].item, item);
        assert_eq!(checks[0].not_before, t0() + Duration::days(1));
    }

    #[test]
    fn release_to_unlistable_states_schedules_nothing() {
        let h = harness();
        let held = h.seed(ItemState::Reserved, &[flags::LISTING_HOLD]);
        let lost = h.seed(ItemState::Reserved, &[]);
        h.fakes.inventory.mark_lost(lost);
        let flagged = h.seed(ItemState::Reserved, &[]);
        h.fakes.reviews.flag(flagged);

        assert_eq!(h.fire(held, ItemEvent::Release).unwrap(), ItemState::Stockroom);
        assert_eq!(h.fire(lost, ItemEvent::Release).unwrap(), ItemState::Lost);
        assert_eq!(h.fire(flagged, ItemEvent::Release).unwrap(), ItemState::UnderReview);

        assert!(h.fakes.jobs.checks().is_empty());
        assert_eq!(h.fakes.notifications.published().len(), 3);
    }

    #[test]
    fn relist_checks_target_exactly_the_states_list_accepts() {
        let lifecycle = item_lifecycle().unwrap();
        let list = lifecycle.event(ItemEvent::List).unwrap();

        for state in ItemState::all() {
            assert_eq!(list.accepts(*state), state.awaits_listing(), "{state}");
        }
    }

    #[test]
    fn reserve_captures_reservation_unless_flagged() {
        let h = harness();
        let item = h.seed(ItemState::Listed, &[]);
        let flagged = h.seed(ItemState::Listed, &[]);
        h.fakes.reviews.flag(flagged);

        let state = h
            .fire_with(
                item,
                Invocation::new(ItemEvent::Reserve).with_param(RESERVATION_PARAM, "cart-7"),
            )
            .unwrap();

        assert_eq!(state, ItemState::Reserved);
        assert_eq!(h.data(item).reservation.as_deref(), Some("cart-7"));
        assert!(h.fire(flagged, ItemEvent::Reserve).unwrap_err().is_no_transition());
    }

    #[test]
    fn purchase_without_order_is_rolled_back() {
        let h = harness();
        let item = h.seed(ItemState::Reserved, &[]);

        let err = h.fire(item, ItemEvent::Purchase).unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::HookFailure {
                phase: Phase::Before,
                hook: "require_order",
                ..
            }
        ));
        assert_eq!(h.state(item), ItemState::Reserved);
        assert!(h.fakes.payouts.entries().is_empty());
        assert!(h.fakes.pricing.frozen().is_empty());
    }

    #[test]
    fn sale_and_return_round_trip_settles_payouts() {
        let h = harness();
        let item = h.seed(ItemState::Listed, &[]);

        let purchase = Invocation::new(ItemEvent::Purchase).with_param(ORDER_PARAM, "order-42");
        assert_eq!(h.fire_with(item, purchase).unwrap(), ItemState::Purchased);
        let data = h.data(item);
        assert!(data.price_frozen);
        assert_eq!(data.order.as_deref(), Some("order-42"));
        assert_eq!(h.fakes.pricing.frozen(), vec![(item, 1_000)]);

        for event in [ItemEvent::Pack, ItemEvent::Ship, ItemEvent::Deliver] {
            h.fire(item, event).unwrap();
        }
        h.clock.advance(Duration::days(3));
        assert_eq!(
            h.fire(item, ItemEvent::RequestReturn).unwrap(),
            ItemState::ReturnRequested
        );
        h.clock.advance(Duration::days(2));
        assert_eq!(h.fire(item, ItemEvent::ReceiveReturn).unwrap(), ItemState::Returned);

        assert_eq!(
            h.fakes.payouts.entries(),
            vec![
                PayoutEntry::Recorded {
                    item,
                    order: "order-42".to_string(),
                    amount_cents: 1_000
                },
                PayoutEntry::Reversed {
                    item,
                    order: "order-42".to_string()
                },
            ]
        );
        let subject = h.engine.load(item.0).unwrap();
        assert!(!subject.data().price_frozen);
        assert_eq!(subject.first_arrival(ItemState::Purchased), Some(t0()));
        assert_eq!(
            subject.first_arrival(ItemState::Returned),
            Some(t0() + Duration::days(5))
        );
        assert_eq!(h.engine.history(item.0).unwrap().len(), 6);
    }

    #[test]
    fn return_request_after_window_is_refused() {
        let h = harness();
        let item = h.seed(ItemState::Shipped, &[]);
        h.fire(item, ItemEvent::Deliver).unwrap();

        h.clock.advance(Duration::days(31));

        assert!(h.fire(item, ItemEvent::RequestReturn).unwrap_err().is_no_transition());
    }

    #[test]
    fn payout_failure_after_commit_keeps_the_sale() {
        let h = harness();
        let item = h.seed(ItemState::Listed, &[]);
        h.fakes.payouts.set_rejecting(true);

        let fired = h
            .engine
            .fire(
                item.0,
                Invocation::new(ItemEvent::Purchase).with_param(ORDER_PARAM, "order-9"),
                &h.services,
            )
            .unwrap();

        assert_eq!(fired.state(), ItemState::Purchased);
        let failed: Vec<&str> = fired.failed_after_commit().iter().map(|o| o.hook).collect();
        assert_eq!(failed, vec!["record_payout"]);
        assert_eq!(h.fakes.pricing.frozen(), vec![(item, 1_000)]);
        assert!(h.fakes.payouts.entries().is_empty());
        assert_eq!(h.errors.reports()[0].component, "after_commit:record_payout");
    }

    struct RejectingCommits(InMemorySubjectStore<ItemMachine>);

    impl SubjectStore<ItemMachine> for RejectingCommits {
        fn insert(&self, subject: &Subject<ItemMachine>) -> Result<(), StoreError> {
            self.0.insert(subject)
        }

        fn load(&self, id: EntityId) -> Result<Option<Subject<ItemMachine>>, StoreError> {
            self.0.load(id)
        }

        fn lock(&self, id: EntityId, timeout: Option<StdDuration>) -> Result<EntityLock, LockError> {
            self.0.lock(id, timeout)
        }

        fn commit(
            &self,
            _subject: &Subject<ItemMachine>,
            _record: HistoryRecord<ItemState>,
            _expected: ExpectedVersion,
        ) -> Result<(), StoreError> {
            Err(StoreError::Conflict("row moved underneath".to_string()))
        }

        fn history(&self, id: EntityId) -> Result<Vec<HistoryRecord<ItemState>>, StoreError> {
            self.0.history(id)
        }
    }

    #[test]
    fn rolled_back_purchase_leaves_collaborators_untouched() {
        let fakes = InMemoryCollaborators::new();
        let services = fakes.services();
        let engine = LifecycleEngine::new(
            Arc::new(item_lifecycle().unwrap()),
            RejectingCommits(InMemorySubjectStore::new()),
        );
        let item = Subject::new(
            EntityId::new(),
            ItemState::Listed,
            ItemData::new("SKU-1", "WH-1").with_price(1_000),
        );
        engine.store().insert(&item).unwrap();

        let err = engine
            .fire(
                item.id(),
                Invocation::new(ItemEvent::Purchase).with_param(ORDER_PARAM, "order-9"),
                &services,
            )
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(engine.load(item.id()).unwrap().state(), ItemState::Listed);
        assert!(!engine.load(item.id()).unwrap().data().price_frozen);
        assert!(fakes.pricing.frozen().is_empty());
        assert!(fakes.payouts.entries().is_empty());
        assert!(fakes.notifications.published().is_empty());
    }

    #[test]
    fn pricing_failure_keeps_item_unlisted() {
        let h = harness();
        let item = h.seed(ItemState::ReadyToList, &[]);
        h.fakes.pricing.set_rejecting(true);

        let err = h.fire(item, ItemEvent::List).unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::HookFailure {
                phase: Phase::Enter,
                hook: "recalculate_price",
                ..
            }
        ));
        assert_eq!(h.state(item), ItemState::ReadyToList);
        assert_eq!(h.data(item).price_cents, Some(1_000));
        assert!(h.engine.history(item.0).unwrap().is_empty());
    }

    #[test]
    fn listing_applies_the_fresh_quote() {
        let h = harness();
        let item = h.seed(ItemState::ReadyToList, &[]);
        h.fakes.pricing.set_quote(PriceQuote {
            price_cents: 1_250,
            final_sale: true,
        });

        assert_eq!(h.fire(item, ItemEvent::List).unwrap(), ItemState::Listed);
        let data = h.data(item);
        assert_eq!(data.price_cents, Some(1_250));
        assert!(data.final_sale);
    }

    #[test]
    fn unreachable_inventory_fails_the_release() {
        let h = harness();
        let item = h.seed(ItemState::Reserved, &[]);
        h.fakes.inventory.set_offline(true);

        let err = h.fire(item, ItemEvent::Release).unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::GuardFailure {
                guard: "misplaced",
                ..
            }
        ));
        assert_eq!(h.state(item), ItemState::Reserved);
    }

    struct DownSink;

    impl NotificationSink for DownSink {
        fn publish(&self, _notice: StateChanged) -> Result<(), NotifyError> {
            Err(NotifyError::Transport("broker unreachable".to_string()))
        }
    }

    #[test]
    fn failed_publication_does_not_undo_the_transition() {
        let mut h = harness();
        h.services.notifications = Arc::new(DownSink);
        let item = h.seed(ItemState::Listed, &[]);

        let fired = h
            .engine
            .fire(item.0, Invocation::new(ItemEvent::Delist), &h.services)
            .unwrap();

        assert_eq!(fired.state(), ItemState::ConsignmentDelisted);
        let failed: Vec<&str> = fired.failed_after_commit().iter().map(|o| o.hook).collect();
        assert_eq!(failed, vec!["publish_state_change"]);
        assert_eq!(h.fakes.jobs.checks().len(), 1);
        assert_eq!(h.state(item), ItemState::ConsignmentDelisted);
        assert_eq!(h.errors.reports()[0].component, "after_commit:publish_state_change");
    }

    #[test]
    fn offline_job_queue_is_reported_only() {
        let h = harness();
        h.fakes.jobs.set_offline(true);
        let item = h.seed(ItemState::PartnerListed, &[]);

        let fired = h
            .engine
            .fire(item.0, Invocation::new(ItemEvent::Delist), &h.services)
            .unwrap();

        assert!(!fired.notifications_ok());
        assert_eq!(fired.failed_after_commit()[0].hook, "schedule_relist_check");
        assert_eq!(h.fakes.notifications.published().len(), 1);
    }

    #[test]
    fn reclaim_depends_on_buyout() {
        let h = harness();
        let bought = h.seed(ItemState::Reclaimable, &[]);
        h.fakes.bags.mark_bought_out("BAG-1");
        assert_eq!(h.fire(bought, ItemEvent::Reclaim).unwrap(), ItemState::Stockroom);

        let h = harness();
        let item = h.seed(ItemState::Reclaimable, &[]);
        assert_eq!(h.fire(item, ItemEvent::Reclaim).unwrap(), ItemState::Reclaimed);
        assert!(!h.data(item).reclaim_requested);
    }

    #[test]
    fn refresh_listing_reprices_without_moving() {
        let h = harness();
        let item = h.seed(ItemState::PartnerListed, &[]);

        assert_eq!(
            h.fire(item, ItemEvent::RefreshListing).unwrap(),
            ItemState::PartnerListed
        );
        assert_eq!(h.data(item).price_cents, Some(2_500));
        assert_eq!(h.engine.load(item.0).unwrap().version(), 1);
    }

    #[test]
    fn named_events_are_parsed() {
        let h = harness();
        let item = h.seed(ItemState::UnderReview, &[]);

        let fired = h
            .engine
            .fire_named(item.0, "clear_review", Some("ops"), &h.services)
            .unwrap();
        assert_eq!(fired.state(), ItemState::Listed);
        assert_eq!(
            h.engine.history(item.0).unwrap().records()[0].source.as_deref(),
            Some("ops")
        );

        let err = h
            .engine
            .fire_named(item.0, "sell", None, &h.services)
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    proptest! {
        #[test]
        fn random_walks_stay_inside_the_catalog(
            events in prop::collection::vec(0usize..21, 1..60),
            lost in any::<bool>(),
            flagged in any::<bool>(),
        ) {
            let h = harness();
            let item = h.seed(ItemState::Drafted, &[]);
            h.fakes.bags.mark_processed("BAG-1");
            if lost {
                h.fakes.inventory.mark_lost(item);
            }
            if flagged {
                h.fakes.reviews.flag(item);
            }
            let lifecycle = h.engine.lifecycle();
            let mut committed = 0u64;

            for index in events {
                let invocation = Invocation::new(ItemEvent::all()[index])
                    .with_param(ORDER_PARAM, "order-1");
                match h.fire_with(item, invocation) {
                    Ok(state) => {
                        committed += 1;
                        prop_assert!(lifecycle.has_state(state));
                    }
                    Err(err) => {
                        prop_assert!(err.is_no_transition(), "unexpected error: {}", err);
                    }
                }
                h.clock.advance(Duration::hours(1));
            }

            let subject = h.engine.load(item.0).unwrap();
            let history = h.engine.store().history(item.0).unwrap();
            prop_assert_eq!(subject.version(), committed);
            prop_assert_eq!(history.len() as u64, committed);
            prop_assert_eq!(h.fakes.notifications.published().len() as u64, committed);
        }
    }
}
