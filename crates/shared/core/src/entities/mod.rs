mod message;
mod service;

pub use message::Message;
pub use service::Service;
