//! Bridge Runner
//!
//! Wires the shared-memory transport (source) to the network transport
//! (destination) for every selected service:
//!
//! ```text
//!   bridge [peer-address] [allow-list]
//!
//!   msgq segments ──▶ relay ──▶ TCP publishers ──▶ peer-address:port(service)
//! ```

pub mod args;
pub mod bridge;

pub use args::Args;
pub use bridge::{exit_code, run_bridge};
