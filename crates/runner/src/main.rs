use clap::Parser;
use log::{error, info};
use msgbridge_core::Catalog;
use msgbridge_msgq::MsgqConfig;
use msgbridge_relay::{ShutdownFlag, install_signal_handlers};
use msgbridge_runner::{Args, exit_code, run_bridge};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.to_config();

    let shutdown = ShutdownFlag::new();
    if let Err(e) = install_signal_handlers(shutdown.clone()) {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    let msgq = MsgqConfig::from_env();
    info!("reading shared memory segments from {}", msgq.path.display());

    let result = run_bridge(Arc::new(Catalog::builtin()), msgq, &config, shutdown);
    exit_code(&result)
}
