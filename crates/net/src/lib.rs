//! Network Publish/Subscribe Transport
//!
//! TCP transport usable across hosts. Every service listens on its own port,
//! taken from the service catalog.
//!
//! ```text
//!   publisher ──connect──▶ subscriber (serving 0.0.0.0:port)
//!        │  Hello{service}  │
//!        │  [len│payload]   │
//!        │  [len│payload]   │
//! ```
//!
//! Publishers follow pub/sub semantics: with no subscriber connected a
//! message is dropped, and a vanished peer is logged and reconnected later
//! rather than failing the send.

mod config;
mod context;
mod frame;
mod inbox;
mod poller;
mod publisher;
mod subscriber;

pub use config::NetConfig;
pub use context::NetContext;
pub use frame::{MAX_FRAME_SIZE, PROTOCOL_VERSION};
pub use poller::NetPoller;
pub use publisher::NetPublisher;
pub use subscriber::NetSubscriber;
