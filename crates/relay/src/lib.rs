//! Message Bridge Relay
//!
//! Forwards every message published on a set of services from one transport
//! to another:
//!
//! - **Filter**: picks the services to bridge from the catalog
//! - **Provision**: one subscriber on the source and one publisher on the
//!   destination per service, bound into a forwarding pair
//! - **Relay**: polls the subscribers and forwards each message to its pair
//! - **Shutdown**: signal-driven flag observed by the relay loop
//!
//! ## Architecture
//!
//! ```text
//!   source transport                        destination transport
//!  ┌──────────────────┐                    ┌──────────────────┐
//!  │ subscriber(svc1) │──┐              ┌─▶│ publisher(svc1)  │
//!  │ subscriber(svc2) │──┼─▶ Poller ─▶ Relay ─▶│ publisher(svc2)  │
//!  │ subscriber(svcN) │──┘      ▲       └─▶│ publisher(svcN)  │
//!  └──────────────────┘         │          └──────────────────┘
//!                         ShutdownFlag ◀── SIGINT / SIGTERM
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod provision;
pub mod relay;
pub mod shutdown;
pub mod stats;

pub use config::{BridgeConfig, RelayConfig};
pub use error::{RelayError, RelayResult};
pub use filter::select_channels;
pub use provision::provision;
pub use relay::{ForwardOutcome, Relay, forward};
pub use shutdown::{ShutdownFlag, SignalEvent, handle_signal, install_signal_handlers};
pub use stats::RelayStats;
