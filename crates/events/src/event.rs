//! Payload contract for messages published on the bus.

use chrono::{DateTime, Utc};

/// A published fact about something that already happened.
///
/// Payloads never change after publication. Consumers route on
/// [`Event::schema_key`] and upcast older versions themselves.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted type name, e.g. "lifecycle.state_changed".
    fn event_type(&self) -> &'static str;

    fn version(&self) -> u32;

    /// Business time of the fact, not publication time.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// `"{event_type}@v{version}"`.
    fn schema_key(&self) -> String {
        format!("{}@v{}", self.event_type(), self.version())
    }
}
