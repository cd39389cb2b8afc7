use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use resale_core::EntityId;

use crate::event::Event;

/// Notification that a lifecycle-managed entity committed a transition.
///
/// Carries only what downstream consumers need to react: which event fired,
/// which entity, and where it ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChanged {
    /// Name of the lifecycle event that caused the change (e.g. "release").
    pub event_kind: String,
    pub entity_id: EntityId,
    pub entity_type: String,
    pub previous_state: String,
    pub new_state: String,
    /// Entity version after the transition.
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl Event for StateChanged {
    fn event_type(&self) -> &'static str {
        "lifecycle.state_changed"
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn notice(source: Option<&str>) -> StateChanged {
        StateChanged {
            event_kind: "release".to_string(),
            entity_id: EntityId::new(),
            entity_type: "item".to_string(),
            previous_state: "reserved".to_string(),
            new_state: "stockroom".to_string(),
            version: 3,
            source: source.map(str::to_string),
            occurred_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn schema_key_names_type_and_version() {
        assert_eq!(notice(None).schema_key(), "lifecycle.state_changed@v1");
    }

    #[test]
    fn absent_source_is_omitted_from_json() {
        let json = serde_json::to_value(notice(None)).unwrap();
        assert!(json.get("source").is_none());
        assert_eq!(json["new_state"], "stockroom");

        let json = serde_json::to_value(notice(Some("warehouse_scan"))).unwrap();
        assert_eq!(json["source"], "warehouse_scan");

        let back: StateChanged = serde_json::from_value(json).unwrap();
        assert_eq!(back.occurred_at(), notice(None).occurred_at);
    }
}
