//! Notification sink port used by after-commit hooks.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::state_changed::StateChanged;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),
    #[error("notification sink unavailable")]
    Unavailable,
}

/// Publish target for state-change notifications.
///
/// Implementations provide at-least-once delivery downstream; the caller does
/// not wait for consumer acknowledgement.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, notice: StateChanged) -> Result<(), NotifyError>;
}

impl<S> NotificationSink for Arc<S>
where
    S: NotificationSink + ?Sized,
{
    fn publish(&self, notice: StateChanged) -> Result<(), NotifyError> {
        (**self).publish(notice)
    }
}

/// Keeps published notices in memory (tests/dev).
#[derive(Debug, Default)]
pub struct RecordingNotificationSink {
    published: Mutex<Vec<StateChanged>>,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<StateChanged> {
        self.published
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn publish(&self, notice: StateChanged) -> Result<(), NotifyError> {
        let mut published = self.published.lock().map_err(|_| NotifyError::Unavailable)?;
        tracing::trace!(entity_id = %notice.entity_id, new_state = %notice.new_state, "recorded notice");
        published.push(notice);
        Ok(())
    }
}
