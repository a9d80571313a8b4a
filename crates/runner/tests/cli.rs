//! Command line parsing

use clap::Parser;
use msgbridge_runner::Args;

#[test]
fn test_defaults_bridge_everything_to_loopback() {
    let args = Args::try_parse_from(["bridge"]).unwrap();
    assert_eq!(args.peer_address, "127.0.0.1");
    assert_eq!(args.allow_list, "");

    let config = args.to_config();
    assert_eq!(config.peer_address, "127.0.0.1");
    assert!(!config.restrict_to_allow_list());
}

#[test]
fn test_positional_peer_and_allow_list() {
    let args = Args::try_parse_from(["bridge", "192.168.43.1", "carState,liveLocation"]).unwrap();
    assert_eq!(args.peer_address, "192.168.43.1");

    let config = args.to_config();
    assert_eq!(config.allow_list, "carState,liveLocation");
    assert!(config.restrict_to_allow_list());
    assert_eq!(config.publisher_retries, 10);
}

#[test]
fn test_peer_only() {
    let args = Args::try_parse_from(["bridge", "10.0.0.2"]).unwrap();
    assert_eq!(args.peer_address, "10.0.0.2");
    assert!(!args.to_config().restrict_to_allow_list());
}

#[test]
fn test_rejects_extra_arguments() {
    assert!(Args::try_parse_from(["bridge", "a", "b", "c"]).is_err());
}
