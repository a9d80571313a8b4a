//! Bridge Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Relay loop tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Longest single wait for a ready subscriber, in milliseconds
    pub poll_timeout_ms: u64,
    /// Immediate retries of an interrupted send before giving up
    pub max_send_retries: u64,
    /// Interval between statistics log lines, in milliseconds
    pub stats_interval_ms: u64,
}

impl RelayConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 100,
            max_send_retries: 1000,
            stats_interval_ms: 10_000,
        }
    }
}

/// Everything needed to set up one direction of the bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Address of the remote side publishers send to
    pub peer_address: String,
    /// Address subscribers on the source transport read from
    pub local_address: String,
    /// Services to bridge, matched by substring. Empty bridges everything.
    pub allow_list: String,
    /// Connection attempts a publisher makes before reporting ready
    pub publisher_retries: u32,
    /// Whether publishers wait (up to `publisher_retries`) for a subscriber
    pub wait_for_subscriber: bool,
    /// Subscribers keep only the newest pending message
    pub conflate: bool,
    pub relay: RelayConfig,
}

impl BridgeConfig {
    /// Bridge to `peer_address`, restricted to `allow_list` when it is not empty
    pub fn new(peer_address: &str, allow_list: &str) -> Self {
        Self {
            peer_address: peer_address.to_string(),
            allow_list: allow_list.to_string(),
            ..Default::default()
        }
    }

    /// Whether the allow-list limits the bridged services
    pub fn restrict_to_allow_list(&self) -> bool {
        !self.allow_list.is_empty()
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            peer_address: "127.0.0.1".to_string(),
            local_address: "127.0.0.1".to_string(),
            allow_list: String::new(),
            publisher_retries: 10,
            wait_for_subscriber: true,
            conflate: false,
            relay: RelayConfig::default(),
        }
    }
}
