//! Publishes state-change notices onto an [`EventBus`].

use uuid::Uuid;

use resale_events::{
    Event, EventBus, EventEnvelope, NotificationSink, NotifyError, StateChanged,
};

/// What subscribers of a [`BusNotificationSink`] receive.
pub type StateChangedEnvelope = EventEnvelope<StateChanged>;

/// [`NotificationSink`] that wraps each notice in an envelope keyed by the
/// entity and sequenced by its post-transition version.
#[derive(Debug, Clone)]
pub struct BusNotificationSink<B> {
    bus: B,
}

impl<B> BusNotificationSink<B>
where
    B: EventBus<StateChangedEnvelope>,
{
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<B> NotificationSink for BusNotificationSink<B>
where
    B: EventBus<StateChangedEnvelope>,
{
    fn publish(&self, notice: StateChanged) -> Result<(), NotifyError> {
        tracing::trace!(
            schema = %notice.schema_key(),
            entity_id = %notice.entity_id,
            version = notice.version,
            "publishing state change"
        );
        let envelope = EventEnvelope::new(
            Uuid::now_v7(),
            notice.entity_id,
            notice.entity_type.clone(),
            notice.version,
            notice,
        );
        self.bus
            .publish(envelope)
            .map_err(|e| NotifyError::Transport(format!("{e:?}")))
    }
}
