//! Socket Pair Provisioner

use crate::config::BridgeConfig;
use crate::error::{RelayError, RelayResult};
use crate::relay::Relay;
use crate::shutdown::ShutdownFlag;
use log::{debug, info};
use msgbridge_ports::{Context, PublishOptions, SubscribeOptions};

/// Create a forwarding pair for every service and return the relay that
/// owns them.
///
/// Subscribers are created on `from`, publishers on `to`, and the poller is
/// taken from `from` since it has to watch the subscribers. Any socket that
/// cannot be created aborts provisioning; nothing is bridged partially.
///
/// The shutdown flag is checked before each service. Once it is set the
/// remaining services are skipped and the relay returned so far stops on
/// its first check.
pub fn provision<S, D>(
    from: &S,
    to: &D,
    services: &[String],
    config: &BridgeConfig,
    shutdown: ShutdownFlag,
) -> RelayResult<Relay<S::Poller, D::Outbound>>
where
    S: Context,
    D: Context,
{
    let subscribe = SubscribeOptions::new(&config.local_address).conflate(config.conflate);
    let publish = PublishOptions::new(&config.peer_address)
        .retries(config.publisher_retries)
        .wait_for_subscriber(config.wait_for_subscriber);

    let mut relay = Relay::new(from.poller(), shutdown.clone(), config.relay.clone());
    for service in services {
        if shutdown.is_set() {
            info!(
                "shutdown requested, skipping {} unprovisioned service(s)",
                services.len() - relay.len()
            );
            break;
        }
        let failed = |source| RelayError::Provision {
            service: service.clone(),
            source,
        };
        let outbound = to.publish(service, &publish).map_err(failed)?;
        let inbound = from.subscribe(service, &subscribe).map_err(failed)?;
        let id = relay.add_pair(inbound, outbound)?;
        debug!(
            "bridging {} from {} to {} at {} ({})",
            service,
            from.name(),
            to.name(),
            config.peer_address,
            id
        );
    }

    info!(
        "provisioned {} service(s) from {} to {}",
        relay.len(),
        from.name(),
        to.name()
    );
    Ok(relay)
}
