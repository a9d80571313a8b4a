//! Transport Configuration

use std::time::Duration;

/// Network transport timing and buffering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetConfig {
    /// Minimum time between two reconnection attempts
    pub reconnect_interval: Duration,
    /// Delay between connection attempts while waiting for a subscriber
    pub retry_delay: Duration,
    /// Timeout for a single TCP connect
    pub connect_timeout: Duration,
    /// A peer that accepts no data for this long is dropped
    pub write_timeout: Duration,
    /// How often blocked readers wake up to check for shutdown
    pub read_timeout: Duration,
    /// Received messages buffered per subscriber before the oldest is dropped
    pub queue_size: usize,
    /// Outgoing frames queued per publisher before new ones are dropped
    pub send_queue: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            reconnect_interval: Duration::from_millis(500),
            retry_delay: Duration::from_millis(100),
            connect_timeout: Duration::from_millis(200),
            write_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_millis(100),
            queue_size: 1024,
            send_queue: 10,
        }
    }
}
