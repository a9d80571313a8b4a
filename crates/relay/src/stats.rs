//! Relay counters

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What the relay loop did over its lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStats {
    /// Messages accepted by the destination transport, per service
    pub forwarded: BTreeMap<String, u64>,
    /// Accepted messages the destination transport later discarded, per
    /// service (no subscriber connected, send queue full)
    pub dropped: BTreeMap<String, u64>,
    /// Ready reports that yielded no message
    pub empty_receives: u64,
    /// Sends repeated after an interruption
    pub retries: u64,
    /// Messages given up on because shutdown was requested mid-send
    pub abandoned: u64,
}

impl RelayStats {
    pub fn record_forwarded(&mut self, service: &str) {
        *self.forwarded.entry(service.to_string()).or_default() += 1;
    }

    /// Messages accepted across all services
    pub fn total_forwarded(&self) -> u64 {
        self.forwarded.values().sum()
    }

    pub fn forwarded_for(&self, service: &str) -> u64 {
        self.forwarded.get(service).copied().unwrap_or(0)
    }

    /// Record the transport's running drop count for `service`
    pub fn set_dropped(&mut self, service: &str, count: u64) {
        if count > 0 {
            self.dropped.insert(service.to_string(), count);
        }
    }

    pub fn total_dropped(&self) -> u64 {
        self.dropped.values().sum()
    }

    pub fn dropped_for(&self, service: &str) -> u64 {
        self.dropped.get(service).copied().unwrap_or(0)
    }
}

impl fmt::Display for RelayStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} forwarded on {} service(s), {} dropped by transport, {} empty receive(s), \
             {} send retry(s), {} abandoned",
            self.total_forwarded(),
            self.forwarded.len(),
            self.total_dropped(),
            self.empty_receives,
            self.retries,
            self.abandoned
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_per_service() {
        let mut stats = RelayStats::default();
        stats.record_forwarded("carState");
        stats.record_forwarded("carState");
        stats.record_forwarded("can");

        assert_eq!(stats.forwarded_for("carState"), 2);
        assert_eq!(stats.forwarded_for("can"), 1);
        assert_eq!(stats.forwarded_for("liveLocation"), 0);
        assert_eq!(stats.total_forwarded(), 3);
        assert!(stats.to_string().starts_with("3 forwarded on 2 service(s)"));
    }

    #[test]
    fn test_transport_drops_are_separate() {
        let mut stats = RelayStats::default();
        stats.record_forwarded("can");
        stats.record_forwarded("can");
        stats.set_dropped("can", 2);
        stats.set_dropped("carState", 0);

        assert_eq!(stats.forwarded_for("can"), 2);
        assert_eq!(stats.dropped_for("can"), 2);
        assert_eq!(stats.total_dropped(), 2);
        assert!(!stats.dropped.contains_key("carState"));
        assert!(stats.to_string().contains("2 dropped by transport"));
    }
}
