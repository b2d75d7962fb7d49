use std::time::Duration;

const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1000);

/// When and how soon an [`EventSocket`](super::EventSocket) reopens its connection.
///
/// Retries are unbounded and always wait the same delay. By default a failed connection is retried and a
/// cleanly closed one is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Wait between losing a connection and the next attempt
    pub delay: Duration,
    /// Reconnect after an open failure, a read error or a failed acknowledgment
    pub reconnect_on_error: bool,
    /// Reconnect after the server or network closed the connection
    pub reconnect_on_close: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
            reconnect_on_error: true,
            reconnect_on_close: false,
        }
    }
}

impl ReconnectPolicy {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn reconnect_on_error(mut self, enabled: bool) -> Self {
        self.reconnect_on_error = enabled;
        self
    }

    pub fn reconnect_on_close(mut self, enabled: bool) -> Self {
        self.reconnect_on_close = enabled;
        self
    }

    /// Reconnect after any disconnection.
    pub fn always() -> Self {
        Self::default().reconnect_on_close(true)
    }
}
