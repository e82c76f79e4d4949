/// Errors raised by a duplex message transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// An I/O error occurred on the underlying connection.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer or the local side closed the connection.
    #[error("transport closed")]
    Closed,

    /// The connection failed for a reason reported by the transport implementation.
    #[error("transport failed: {0}")]
    Failed(String),
}

impl TransportError {
    /// Convenience constructor for implementation-specific failures.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
