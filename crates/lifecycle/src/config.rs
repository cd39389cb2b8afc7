//! Engine tuning knobs.

use std::time::Duration;

/// Per-engine configuration.
///
/// Usually built from process settings by the wiring layer; defaults are
/// suitable for tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Shows up as `engine` on every fire span.
    pub name: String,
    /// How long `fire` waits for the per-entity lock. `None` waits forever.
    pub lock_timeout: Option<Duration>,
    /// Contain panics raised by after-commit hooks instead of unwinding into
    /// the caller after its transition already committed.
    pub catch_after_commit_panics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "lifecycle".to_string(),
            lock_timeout: Some(Duration::from_secs(5)),
            catch_after_commit_panics: true,
        }
    }
}

impl EngineConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_catch_after_commit_panics(mut self, catch: bool) -> Self {
        self.catch_after_commit_panics = catch;
        self
    }
}
