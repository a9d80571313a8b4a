use crate::error::TransportResult;
use msgbridge_core::Message;
use std::fmt;
use std::time::Duration;

/// Identity of an inbound socket inside the poller that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketId(pub usize);

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket#{}", self.0)
    }
}

/// Options for creating an inbound (subscribe) socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Peer address to receive from. Transports may treat an empty address
    /// as "accept from anyone" (serve) instead of connecting out.
    pub address: String,
    /// Keep only the newest pending message
    pub conflate: bool,
}

impl SubscribeOptions {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            conflate: false,
        }
    }

    pub fn conflate(mut self, conflate: bool) -> Self {
        self.conflate = conflate;
        self
    }
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self::new("127.0.0.1")
    }
}

/// Options for creating an outbound (publish) socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    /// Peer address to publish towards
    pub address: String,
    /// How many times to try reaching the peer before reporting ready
    pub retries: u32,
    /// Whether socket creation should wait for a subscriber (bounded by `retries`)
    pub wait_for_subscriber: bool,
}

impl PublishOptions {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            retries: 10,
            wait_for_subscriber: true,
        }
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn wait_for_subscriber(mut self, wait: bool) -> Self {
        self.wait_for_subscriber = wait;
        self
    }
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self::new("127.0.0.1")
    }
}

/// Receiving end of one service on one transport
pub trait InboundSocket: Send {
    /// Service this socket is subscribed to
    fn service(&self) -> &str;

    /// Receive one message without blocking.
    ///
    /// `Ok(None)` means nothing was available (a spurious wakeup is not an error).
    fn receive(&mut self) -> TransportResult<Option<Message>>;
}

/// Sending end of one service on one transport
pub trait OutboundSocket: Send {
    /// Service this socket publishes
    fn service(&self) -> &str;

    /// Send one message.
    ///
    /// A failure whose [`TransportError::is_transient`] is true may be retried
    /// with the same message.
    ///
    /// [`TransportError::is_transient`]: crate::TransportError::is_transient
    fn send(&mut self, msg: &Message) -> TransportResult<()>;

    /// Messages accepted by `send` that the transport later discarded
    /// (no subscriber, queue full). Transports that never discard report 0.
    fn dropped(&self) -> u64 {
        0
    }
}

/// Readiness multiplexer over inbound sockets of one transport
///
/// The poller takes ownership of every socket registered with it and hands
/// out a [`SocketId`] in exchange.
pub trait Poller: Send {
    type Socket: InboundSocket;

    /// Register a socket for polling
    fn register(&mut self, socket: Self::Socket) -> SocketId;

    /// Wait up to `timeout` for registered sockets to have data.
    ///
    /// Returns the ready sockets; an empty list means the timeout elapsed
    /// (or the wait was interrupted).
    fn poll(&mut self, timeout: Duration) -> Vec<SocketId>;

    /// Access a registered socket
    fn socket_mut(&mut self, id: SocketId) -> Option<&mut Self::Socket>;

    /// Number of registered sockets
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Factory for the sockets and poller of one transport
pub trait Context {
    type Inbound: InboundSocket;
    type Outbound: OutboundSocket;
    type Poller: Poller<Socket = Self::Inbound>;

    /// Transport name for logging (e.g., "msgq", "net")
    fn name(&self) -> &str;

    /// Create a socket subscribed to `service`
    fn subscribe(
        &self,
        service: &str,
        options: &SubscribeOptions,
    ) -> TransportResult<Self::Inbound>;

    /// Create a socket publishing `service`
    fn publish(&self, service: &str, options: &PublishOptions) -> TransportResult<Self::Outbound>;

    /// Create an empty poller for this transport's inbound sockets
    fn poller(&self) -> Self::Poller;
}
