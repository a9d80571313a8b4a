//! Multiplexed Relay Loop
//!
//! ```text
//!   WAITING ──ready sockets──▶ DRAINING ──all drained──▶ WAITING
//!      │                          │
//!      └──── shutdown flag ───────┴──▶ STOPPED
//! ```
//!
//! The loop owns the poller (and through it every subscriber) and every
//! publisher. Each ready subscriber gets exactly one receive per poll, and a
//! received message is sent to its paired publisher before the next receive,
//! so per-service order is whatever order the source transport delivers.

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::shutdown::ShutdownFlag;
use crate::stats::RelayStats;
use log::{debug, info};
use msgbridge_core::Message;
use msgbridge_ports::{InboundSocket, OutboundSocket, Poller, SocketId};
use std::collections::BTreeMap;
use std::hint;
use std::time::Instant;

/// How a forward attempt ended without a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// Sent, after `retries` interrupted attempts
    Delivered { retries: u64 },
    /// Dropped because shutdown was requested while the send kept failing
    Abandoned { retries: u64 },
}

/// Send `msg` on `outbound`, retrying interrupted sends.
///
/// An interrupted send is repeated immediately, at most `max_retries` times,
/// and the shutdown flag is checked before each repeat. Any failure seen once
/// shutdown has been requested abandons the message instead of failing.
pub fn forward<O: OutboundSocket>(
    outbound: &mut O,
    msg: &Message,
    shutdown: &ShutdownFlag,
    max_retries: u64,
) -> RelayResult<ForwardOutcome> {
    let mut retries = 0;
    loop {
        let err = match outbound.send(msg) {
            Ok(()) => return Ok(ForwardOutcome::Delivered { retries }),
            Err(err) => err,
        };

        if shutdown.is_set() {
            debug!(
                "abandoning message on {} during shutdown: {}",
                outbound.service(),
                err
            );
            return Ok(ForwardOutcome::Abandoned { retries });
        }
        if !err.is_transient() {
            return Err(RelayError::Send {
                service: outbound.service().to_string(),
                source: err,
            });
        }
        if retries >= max_retries {
            return Err(RelayError::RetriesExhausted {
                service: outbound.service().to_string(),
                attempts: retries + 1,
            });
        }
        retries += 1;
        hint::spin_loop();
    }
}

/// One bridged service: where its messages go
#[derive(Debug)]
struct ForwardingPair<O> {
    service: String,
    outbound: O,
}

/// The running bridge for one direction
///
/// Forwarding pairs can only be added through [`Relay::add_pair`], which
/// registers the subscriber and records its publisher in one step, so every
/// socket the poller can report has exactly one publisher.
pub struct Relay<P: Poller, O: OutboundSocket> {
    poller: P,
    pairs: BTreeMap<SocketId, ForwardingPair<O>>,
    shutdown: ShutdownFlag,
    config: RelayConfig,
    stats: RelayStats,
}

impl<P: Poller, O: OutboundSocket> Relay<P, O> {
    pub fn new(poller: P, shutdown: ShutdownFlag, config: RelayConfig) -> Self {
        Self {
            poller,
            pairs: BTreeMap::new(),
            shutdown,
            config,
            stats: RelayStats::default(),
        }
    }

    /// Bind `inbound` to `outbound` and start polling `inbound`.
    ///
    /// Both sockets must carry the same service.
    pub fn add_pair(&mut self, inbound: P::Socket, outbound: O) -> RelayResult<SocketId> {
        if inbound.service() != outbound.service() {
            return Err(RelayError::MismatchedPair {
                inbound: inbound.service().to_string(),
                outbound: outbound.service().to_string(),
            });
        }
        let service = inbound.service().to_string();
        let id = self.poller.register(inbound);
        self.pairs.insert(id, ForwardingPair { service, outbound });
        Ok(id)
    }

    /// Bridged services, in registration order
    pub fn services(&self) -> Vec<&str> {
        self.pairs.values().map(|p| p.service.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    /// Forward messages until shutdown is requested.
    ///
    /// Returns the final counters on a clean stop. A send that fails for any
    /// reason other than an interruption, or stays interrupted past the retry
    /// limit, stops the relay with an error.
    pub fn run(&mut self) -> RelayResult<RelayStats> {
        info!(
            "relay started: {} service(s), poll timeout {:?}",
            self.pairs.len(),
            self.config.poll_timeout()
        );
        let mut last_report = Instant::now();

        while !self.shutdown.is_set() {
            let ready = self.poller.poll(self.config.poll_timeout());
            for id in ready {
                if self.shutdown.is_set() {
                    break;
                }
                self.drain(id)?;
            }

            if last_report.elapsed() >= self.config.stats_interval() {
                self.collect_drops();
                debug!("relay: {}", self.stats);
                last_report = Instant::now();
            }
        }

        self.collect_drops();
        info!("relay stopped: {}", self.stats);
        Ok(self.stats.clone())
    }

    fn collect_drops(&mut self) {
        for pair in self.pairs.values() {
            self.stats.set_dropped(&pair.service, pair.outbound.dropped());
        }
    }

    /// Receive at most one message from `id` and forward it
    fn drain(&mut self, id: SocketId) -> RelayResult<()> {
        let socket = self
            .poller
            .socket_mut(id)
            .ok_or(RelayError::UnmappedSocket(id))?;
        let received = socket.receive();
        let pair = self
            .pairs
            .get_mut(&id)
            .ok_or(RelayError::UnmappedSocket(id))?;

        let msg = match received {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                self.stats.empty_receives += 1;
                return Ok(());
            }
            Err(e) => {
                debug!("receive on {} failed: {}", pair.service, e);
                self.stats.empty_receives += 1;
                return Ok(());
            }
        };

        match forward(
            &mut pair.outbound,
            &msg,
            &self.shutdown,
            self.config.max_send_retries,
        )? {
            ForwardOutcome::Delivered { retries } => {
                self.stats.retries += retries;
                self.stats.record_forwarded(&pair.service);
            }
            ForwardOutcome::Abandoned { retries } => {
                self.stats.retries += retries;
                self.stats.abandoned += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgbridge_ports::{TransportError, TransportResult};
    use std::collections::VecDeque;

    /// Outbound socket replaying a fixed list of send results
    struct Scripted {
        results: VecDeque<TransportResult<()>>,
        delivered: Vec<Message>,
        attempts: usize,
        trigger_on_attempt: Option<(usize, ShutdownFlag)>,
    }

    impl Scripted {
        fn new(results: Vec<TransportResult<()>>) -> Self {
            Self {
                results: results.into(),
                delivered: Vec::new(),
                attempts: 0,
                trigger_on_attempt: None,
            }
        }
    }

    impl OutboundSocket for Scripted {
        fn service(&self) -> &str {
            "carState"
        }

        fn send(&mut self, msg: &Message) -> TransportResult<()> {
            self.attempts += 1;
            if let Some((attempt, flag)) = &self.trigger_on_attempt {
                if *attempt == self.attempts {
                    flag.trigger();
                }
            }
            let result = self.results.pop_front().unwrap_or(Ok(()));
            if result.is_ok() {
                self.delivered.push(msg.clone());
            }
            result
        }
    }

    fn msg() -> Message {
        Message::from(&b"payload"[..])
    }

    #[test]
    fn test_interrupted_send_is_retried_once_delivered() {
        let mut out = Scripted::new(vec![
            Err(TransportError::Interrupted),
            Err(TransportError::Interrupted),
            Ok(()),
        ]);
        let outcome = forward(&mut out, &msg(), &ShutdownFlag::new(), 10).unwrap();
        assert_eq!(outcome, ForwardOutcome::Delivered { retries: 2 });
        assert_eq!(out.delivered, vec![msg()]);
        assert_eq!(out.attempts, 3);
    }

    #[test]
    fn test_fatal_send_error() {
        let mut out = Scripted::new(vec![Err(TransportError::Closed)]);
        let err = forward(&mut out, &msg(), &ShutdownFlag::new(), 10).unwrap_err();
        assert_eq!(
            err,
            RelayError::Send {
                service: "carState".to_string(),
                source: TransportError::Closed,
            }
        );
        assert_eq!(out.attempts, 1);
    }

    #[test]
    fn test_retry_limit() {
        let mut out = Scripted::new(vec![Err(TransportError::Interrupted); 10]);
        let err = forward(&mut out, &msg(), &ShutdownFlag::new(), 3).unwrap_err();
        assert!(matches!(err, RelayError::RetriesExhausted { attempts: 4, .. }));
        assert_eq!(out.attempts, 4);
        assert!(out.delivered.is_empty());
    }

    #[test]
    fn test_shutdown_during_retries_abandons() {
        let flag = ShutdownFlag::new();
        let mut out = Scripted::new(vec![Err(TransportError::Interrupted); 100]);
        out.trigger_on_attempt = Some((5, flag.clone()));

        let outcome = forward(&mut out, &msg(), &flag, 1000).unwrap();
        assert_eq!(outcome, ForwardOutcome::Abandoned { retries: 4 });
        // No send after the flag was observed
        assert_eq!(out.attempts, 5);
    }

    #[test]
    fn test_fatal_error_after_shutdown_is_tolerated() {
        let flag = ShutdownFlag::new();
        flag.trigger();
        let mut out = Scripted::new(vec![Err(TransportError::Io("reset".to_string()))]);
        let outcome = forward(&mut out, &msg(), &flag, 10).unwrap();
        assert_eq!(outcome, ForwardOutcome::Abandoned { retries: 0 });
    }

    #[test]
    fn test_pair_must_share_a_service() {
        use msgbridge_ports::mock::MockContext;
        use msgbridge_ports::{Context, PublishOptions, SubscribeOptions};

        let source = MockContext::new("msgq");
        let dest = MockContext::new("net");
        let mut relay = Relay::new(source.poller(), ShutdownFlag::new(), RelayConfig::default());

        let inbound = source
            .subscribe("carState", &SubscribeOptions::default())
            .unwrap();
        let outbound = dest
            .publish("liveLocation", &PublishOptions::default())
            .unwrap();
        assert_eq!(
            relay.add_pair(inbound, outbound).unwrap_err(),
            RelayError::MismatchedPair {
                inbound: "carState".to_string(),
                outbound: "liveLocation".to_string(),
            }
        );
        assert!(relay.is_empty());

        let inbound = source
            .subscribe("carState", &SubscribeOptions::default())
            .unwrap();
        let outbound = dest.publish("carState", &PublishOptions::default()).unwrap();
        relay.add_pair(inbound, outbound).unwrap();
        assert_eq!(relay.services(), vec!["carState"]);
    }

    #[test]
    fn test_successful_send_ignores_shutdown() {
        let flag = ShutdownFlag::new();
        flag.trigger();
        let mut out = Scripted::new(vec![]);
        let outcome = forward(&mut out, &msg(), &flag, 10).unwrap();
        assert_eq!(outcome, ForwardOutcome::Delivered { retries: 0 });
    }
}
