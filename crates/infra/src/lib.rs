//! Infrastructure layer: adapters and wiring around the item lifecycle.
//!
//! - `event_bus`: publishes committed state changes as envelopes on a bus
//! - `jobs`: delayed background jobs with retry/backoff and the relist runner
//! - `config`: `RESALE_*` environment settings
//! - `runtime`: assembles a ready-to-use item engine

pub mod config;
pub mod event_bus;
pub mod jobs;
pub mod runtime;


pub use config::{ConfigError, Settings};
pub use event_bus::{BusNotificationSink, StateChangedEnvelope};
pub use runtime::{ItemBus, ItemEngine, ItemRuntime, ItemRuntimeBuilder, ItemStore};

/// Install the process-wide subscriber described by `settings`.
pub fn init_logging(settings: &Settings) {
    resale_observability::init_with(&settings.log);
}
