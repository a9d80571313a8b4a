//! Transport context: maps services to ports and creates sockets

use crate::config::NetConfig;
use crate::poller::NetPoller;
use crate::publisher::NetPublisher;
use crate::subscriber::NetSubscriber;
use msgbridge_core::Catalog;
use msgbridge_ports::{
    Context, PublishOptions, SubscribeOptions, TransportError, TransportResult,
};
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

/// TCP transport context
///
/// Service ports come from the catalog, so both ends of a bridge must be
/// built from the same catalog.
#[derive(Debug, Clone)]
pub struct NetContext {
    catalog: Arc<Catalog>,
    config: NetConfig,
}

impl NetContext {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_config(catalog, NetConfig::default())
    }

    pub fn with_config(catalog: Arc<Catalog>, config: NetConfig) -> Self {
        Self { catalog, config }
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    fn port(&self, service: &str) -> TransportResult<u16> {
        self.catalog
            .port(service)
            .ok_or_else(|| TransportError::UnknownService(service.to_string()))
    }

    fn resolve(&self, address: &str, port: u16) -> TransportResult<SocketAddr> {
        (address, port)
            .to_socket_addrs()
            .map_err(|e| TransportError::InvalidAddress(format!("{}: {}", address, e)))?
            .next()
            .ok_or_else(|| TransportError::InvalidAddress(address.to_string()))
    }
}

impl Context for NetContext {
    type Inbound = NetSubscriber;
    type Outbound = NetPublisher;
    type Poller = NetPoller;

    fn name(&self) -> &str {
        "net"
    }

    /// An empty address serves the service port for publishers to connect to;
    /// any other address connects out to a publisher bound there
    fn subscribe(
        &self,
        service: &str,
        options: &SubscribeOptions,
    ) -> TransportResult<NetSubscriber> {
        let port = self.port(service)?;
        if options.address.is_empty() {
            NetSubscriber::serve(service, port, options.conflate, &self.config)
        } else {
            let addr = self.resolve(&options.address, port)?;
            NetSubscriber::connect(service, addr, options.conflate, &self.config)
        }
    }

    fn publish(&self, service: &str, options: &PublishOptions) -> TransportResult<NetPublisher> {
        let port = self.port(service)?;
        if options.address.is_empty() {
            return Err(TransportError::InvalidAddress(
                "publisher needs a peer address".to_string(),
            ));
        }
        let addr = self.resolve(&options.address, port)?;
        Ok(NetPublisher::connect(service, addr, options, &self.config))
    }

    fn poller(&self) -> NetPoller {
        NetPoller::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> NetContext {
        NetContext::new(Arc::new(Catalog::from_names(["carState", "liveLocation"])))
    }

    #[test]
    fn test_unknown_service_is_rejected() {
        let ctx = context();
        let options = PublishOptions::new("127.0.0.1").wait_for_subscriber(false);
        assert!(matches!(
            ctx.publish("gpsLocation", &options),
            Err(TransportError::UnknownService(name)) if name == "gpsLocation"
        ));
    }

    #[test]
    fn test_publisher_requires_address() {
        let ctx = context();
        let options = PublishOptions::new("").wait_for_subscriber(false);
        assert!(matches!(
            ctx.publish("carState", &options),
            Err(TransportError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_publisher_targets_catalog_port() {
        let ctx = context();
        let options = PublishOptions::new("127.0.0.1").wait_for_subscriber(false);
        let publisher = ctx.publish("liveLocation", &options).unwrap();
        assert_eq!(publisher.peer().port(), 8002);
        assert!(publisher.peer().ip().is_loopback());
    }

    #[test]
    fn test_bad_address_is_rejected() {
        let ctx = context();
        let options = SubscribeOptions::new("not an address");
        assert!(matches!(
            ctx.subscribe("carState", &options),
            Err(TransportError::InvalidAddress(_))
        ));
    }
}
