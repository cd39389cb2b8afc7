use serde::{Deserialize, Serialize};
use uuid::Uuid;

use resale_core::EntityId;

/// Envelope for a published event, carrying stream metadata.
///
/// Notes:
/// - `sequence_number` is the entity version the event was produced at, so
///   consumers can drop duplicates and detect gaps per entity.
/// - `payload` is the domain-agnostic event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    entity_id: EntityId,
    entity_type: String,

    /// Monotonically increasing position in the entity stream.
    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        entity_id: EntityId,
        entity_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            entity_id,
            entity_type: entity_type.into(),
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_expose_stream_metadata() {
        let event_id = Uuid::now_v7();
        let entity_id = EntityId::new();
        let envelope = EventEnvelope::new(event_id, entity_id, "item", 9, "payload");

        assert_eq!(envelope.event_id(), event_id);
        assert_eq!(envelope.entity_id(), entity_id);
        assert_eq!(envelope.entity_type(), "item");
        assert_eq!(envelope.sequence_number(), 9);
        assert_eq!(envelope.into_payload(), "payload");
    }
}
