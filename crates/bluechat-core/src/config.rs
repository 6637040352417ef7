//! Engine tunables.

use std::time::Duration;

/// Quiet period after the last keystroke before typing is reported stopped.
pub const DEFAULT_TYPING_IDLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Name given to a session created for a sender we never saw announce itself.
pub const DEFAULT_PLACEHOLDER_NAME: &str = "Unknown";

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Keystroke idle timeout
    pub typing_idle_timeout: Duration,
    /// Display name for sessions opened by an unknown sender
    pub placeholder_name: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            typing_idle_timeout: DEFAULT_TYPING_IDLE_TIMEOUT,
            placeholder_name: DEFAULT_PLACEHOLDER_NAME.to_string(),
        }
    }
}
