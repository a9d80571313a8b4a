use msgbridge_ports::{SocketId, TransportError};
use thiserror::Error;

/// Error type for the bridge
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// A socket for `service` could not be created
    #[error("cannot provision {service}: {source}")]
    Provision {
        service: String,
        source: TransportError,
    },

    /// A send on `service` failed with a non-transient error
    #[error("send on {service} failed: {source}")]
    Send {
        service: String,
        source: TransportError,
    },

    #[error("send on {service} still interrupted after {attempts} attempts")]
    RetriesExhausted { service: String, attempts: u64 },

    /// A subscriber and a publisher for different services were paired
    #[error("cannot pair subscriber {inbound} with publisher {outbound}")]
    MismatchedPair { inbound: String, outbound: String },

    /// The poller reported a socket with no forwarding pair
    #[error("no forwarding pair for {0}")]
    UnmappedSocket(SocketId),

    #[error("signal handling: {0}")]
    Signal(String),
}

pub type RelayResult<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_service() {
        let err = RelayError::Send {
            service: "carState".to_string(),
            source: TransportError::Closed,
        };
        assert_eq!(err.to_string(), "send on carState failed: socket closed");

        let err = RelayError::RetriesExhausted {
            service: "can".to_string(),
            attempts: 1001,
        };
        assert!(err.to_string().contains("1001 attempts"));

        assert_eq!(
            RelayError::UnmappedSocket(SocketId(3)).to_string(),
            "no forwarding pair for socket#3"
        );
    }

    #[test]
    fn test_source_is_exposed() {
        use std::error::Error as _;
        let err = RelayError::Provision {
            service: "carState".to_string(),
            source: TransportError::UnknownService("carState".to_string()),
        };
        assert!(err.source().is_some());
    }
}
