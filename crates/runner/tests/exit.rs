//! Process exit status after the bridge stops

use msgbridge_core::{Catalog, Service};
use msgbridge_msgq::MsgqConfig;
use msgbridge_relay::{BridgeConfig, RelayConfig, ShutdownFlag, SignalEvent, handle_signal};
use msgbridge_runner::{exit_code, run_bridge};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn temp_msgq() -> MsgqConfig {
    let dir = std::env::temp_dir().join(format!("bridge-exit-{}", uuid::Uuid::new_v4()));
    MsgqConfig::with_path(dir)
}

fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::from_services([Service::new("carState", 1)]))
}

#[test]
fn test_fatal_error_exits_with_failure() {
    let _ = env_logger::try_init();
    // A publisher without a peer address cannot be provisioned
    let config = BridgeConfig::new("", "");

    let result = run_bridge(catalog(), temp_msgq(), &config, ShutdownFlag::new());
    assert!(result.is_err());
    assert_eq!(exit_code(&result), ExitCode::FAILURE);
}

#[test]
fn test_signal_stop_exits_with_success() {
    let _ = env_logger::try_init();
    let config = BridgeConfig {
        wait_for_subscriber: false,
        relay: RelayConfig {
            poll_timeout_ms: 10,
            ..Default::default()
        },
        ..BridgeConfig::new("127.0.0.1", "carState")
    };
    let shutdown = ShutdownFlag::new();
    let signaller = {
        let shutdown = shutdown.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            handle_signal(SignalEvent::Terminate, &shutdown);
        })
    };

    let result = run_bridge(catalog(), temp_msgq(), &config, shutdown);
    signaller.join().unwrap();
    assert!(result.is_ok());
    assert_eq!(exit_code(&result), ExitCode::SUCCESS);
}
