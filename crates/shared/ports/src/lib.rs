//! Message Bridge Ports
//!
//! Capability traits every transport implements. The relay only ever talks to
//! a transport through these four seams:
//!
//! - [`Context`]: creates sockets and pollers for one transport
//! - [`InboundSocket`]: non-blocking receive on one service
//! - [`OutboundSocket`]: send on one service
//! - [`Poller`]: bounded readiness wait across many inbound sockets

mod error;
mod socket;

#[cfg(feature = "mock")]
pub mod mock;

pub use error::{TransportError, TransportResult};
pub use socket::{
    Context, InboundSocket, OutboundSocket, Poller, PublishOptions, SocketId, SubscribeOptions,
};
