//! Autosave timing configuration.

use std::time::Duration;

/// Title given to a fresh document.
pub const DEFAULT_TITLE: &str = "untitled";

/// Timing and defaults for the save scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before a save is attempted
    pub debounce: Duration,
    /// Fixed cadence of the backstop save, independent of edits
    pub interval: Duration,
    /// How long the `saved` status stays visible before reverting to `idle`
    pub status_revert: Duration,
    /// Title used by `new_document`
    pub default_title: String,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(3000),
            interval: Duration::from_millis(30_000),
            status_revert: Duration::from_millis(2000),
            default_title: DEFAULT_TITLE.to_string(),
        }
    }
}

impl AutosaveConfig {
    /// Build a config from millisecond values, keeping the default title.
    pub fn from_millis(debounce_ms: u64, interval_ms: u64, status_revert_ms: u64) -> Self {
        Self {
            debounce: Duration::from_millis(debounce_ms),
            interval: Duration::from_millis(interval_ms),
            status_revert: Duration::from_millis(status_revert_ms),
            ..Default::default()
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_status_revert(mut self, status_revert: Duration) -> Self {
        self.status_revert = status_revert;
        self
    }
}
