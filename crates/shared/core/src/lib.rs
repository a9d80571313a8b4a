//! Message Bridge Core Domain
//!
//! Pure domain types shared by both transports and the relay.
//! This crate contains no I/O and no threads.

pub mod catalog;
pub mod entities;

// Re-export commonly used types at crate root
pub use catalog::{Catalog, EXCLUDED_SERVICES, FIRST_SERVICE_PORT, is_excluded};
pub use entities::{Message, Service};
