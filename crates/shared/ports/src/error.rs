use thiserror::Error;

/// Error type for transport operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The operation was interrupted before it completed and may be retried
    #[error("operation interrupted")]
    Interrupted,

    #[error("socket closed")]
    Closed,

    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("message of {size} bytes exceeds limit of {limit} bytes")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl TransportError {
    /// Whether the failed operation may simply be attempted again
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Interrupted)
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::Interrupted => TransportError::Interrupted,
            _ => TransportError::Io(err.to_string()),
        }
    }
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_interrupted_is_transient() {
        assert!(TransportError::Interrupted.is_transient());
        assert!(!TransportError::Closed.is_transient());
        assert!(!TransportError::Io("reset".to_string()).is_transient());
        assert!(
            !TransportError::MessageTooLarge {
                size: 10,
                limit: 1
            }
            .is_transient()
        );
    }

    #[test]
    fn test_io_interrupted_maps_to_transient() {
        let err: TransportError = std::io::Error::from(std::io::ErrorKind::Interrupted).into();
        assert_eq!(err, TransportError::Interrupted);

        let err: TransportError = std::io::Error::from(std::io::ErrorKind::BrokenPipe).into();
        assert!(matches!(err, TransportError::Io(_)));
    }
}
