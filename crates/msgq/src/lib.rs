//! Shared-Memory Message Queue Transport
//!
//! Low-latency single-host transport. Every service owns one memory-mapped
//! segment holding a byte ring:
//!
//! ```text
//! ┌──────────────────────────── segment file ─────────────────────────────┐
//! │ header: magic │ capacity │ reserve │ commit │ ...  │ ring (capacity)  │
//! └───────────────────────────────────────────────────────────────────────┘
//!                                                        │
//!          ┌─────────────────────────────────────────────┘
//!          ▼
//!        [len│payload][len│payload][WRAP ....]
//! ```
//!
//! One publisher writes, any number of subscribers read. Publishers never
//! wait for readers: a reader that falls a full ring behind skips ahead to
//! the newest data.

mod config;
mod context;
mod poller;
mod ring;
mod segment;
mod socket;

pub use config::{DEFAULT_SEGMENT_SIZE, MsgqConfig};
pub use context::MsgqContext;
pub use poller::MsgqPoller;
pub use socket::{MsgqPublisher, MsgqSubscriber};
