use log::{error, info, warn};
use msgbridge_core::Catalog;
use msgbridge_msgq::{MsgqConfig, MsgqContext};
use msgbridge_net::NetContext;
use msgbridge_relay::{
    BridgeConfig, RelayResult, RelayStats, ShutdownFlag, provision, select_channels,
};
use std::process::ExitCode;
use std::sync::Arc;

/// Bridge `catalog` services from shared memory to the network peer until
/// `shutdown` is set
pub fn run_bridge(
    catalog: Arc<Catalog>,
    msgq: MsgqConfig,
    config: &BridgeConfig,
    shutdown: ShutdownFlag,
) -> RelayResult<RelayStats> {
    let restrict = config.restrict_to_allow_list();
    let services = select_channels(&catalog, &config.allow_list, restrict);
    if services.is_empty() {
        warn!("no services selected for allow-list {:?}", config.allow_list);
    }
    info!(
        "bridging {} service(s) to {}: {}",
        services.len(),
        config.peer_address,
        services.join(", ")
    );

    let source = MsgqContext::new(msgq);
    let dest = NetContext::new(catalog);
    let mut relay = provision(&source, &dest, &services, config, shutdown)?;
    relay.run()
}

/// Process exit status for a finished bridge: success after a clean stop,
/// failure after a fatal error
pub fn exit_code(result: &RelayResult<RelayStats>) -> ExitCode {
    match result {
        Ok(stats) => {
            info!("bridge exited cleanly: {}", stats);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("bridge failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgbridge_core::Service;

    #[test]
    fn test_stops_on_preset_shutdown() {
        let dir = std::env::temp_dir().join(format!("bridge-runner-{}", uuid::Uuid::new_v4()));
        let catalog = Arc::new(Catalog::from_services([Service::new("carState", 1)]));
        let config = BridgeConfig {
            wait_for_subscriber: false,
            ..BridgeConfig::new("127.0.0.1", "carState")
        };
        let shutdown = ShutdownFlag::new();
        shutdown.trigger();

        let stats = run_bridge(catalog, MsgqConfig::with_path(dir), &config, shutdown).unwrap();
        assert_eq!(stats.total_forwarded(), 0);
    }

    #[test]
    fn test_unknown_peer_fails_provisioning() {
        let dir = std::env::temp_dir().join(format!("bridge-runner-{}", uuid::Uuid::new_v4()));
        let catalog = Arc::new(Catalog::from_services([Service::new("carState", 1)]));
        let config = BridgeConfig {
            wait_for_subscriber: false,
            ..BridgeConfig::new("", "")
        };

        let result = run_bridge(catalog, MsgqConfig::with_path(dir), &config, ShutdownFlag::new());
        assert!(matches!(
            result,
            Err(msgbridge_relay::RelayError::Provision { .. })
        ));
    }
}
