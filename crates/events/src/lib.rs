//! Event mechanics: payload trait, envelopes, pub/sub bus and the
//! state-change notification contract published after lifecycle commits.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod notify;
pub mod state_changed;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use notify::{NotificationSink, NotifyError, RecordingNotificationSink};
pub use state_changed::StateChanged;
