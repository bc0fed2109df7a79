//! Session configuration

use std::time::Duration;

/// Tuning for one chat session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a remote typing indicator lives without a renewing signal
    pub typing_window: Duration,

    /// Local input inactivity after which `typing_stop` is sent
    pub typing_idle: Duration,

    /// How long a send may stay unconfirmed before it is rolled back
    pub send_timeout: Duration,

    /// Messages per history page (1..=50)
    pub page_size: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            typing_window: Duration::from_secs(2),
            typing_idle: Duration::from_secs(2),
            send_timeout: Duration::from_secs(10),
            page_size: 50,
        }
    }
}

impl SessionConfig {
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size.clamp(1, 50);
        self
    }
}
