//! Bus-backed adapters.
//!
//! The bus abstraction lives in `resale-events` as pure mechanics. This module
//! connects it to the lifecycle's after-commit notification port.

pub mod notification_sink;

pub use notification_sink::{BusNotificationSink, StateChangedEnvelope};
