use kstream_frame::FrameError;
use kstream_transport::TransportError;

/// Errors that can occur in demultiplexer and channel stream operations.
#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    /// An inbound frame violated the wire protocol.
    #[error("frame error: {0}")]
    Frame(FrameError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The receive loop ended with a failure before this channel was drained.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// The stream lacks the capability for the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// A stream already consumes this channel.
    #[error("channel {0} already bound to a stream")]
    ChannelInUse(u8),

    /// Streams can only be bound before the receive loop starts.
    #[error("demultiplexer already started")]
    AlreadyStarted,

    /// The receive loop was never started.
    #[error("demultiplexer not started")]
    NotStarted,

    /// The first port-forward frame on a channel was shorter than its port prefix.
    #[error("channel {0} missing port-forward prefix")]
    MissingPortPrefix(u8),

    /// The receive loop task panicked or was aborted.
    #[error("receive loop failed: {0}")]
    Join(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote command reported a failure status.
    #[error("remote command failed: {0}")]
    ExecFailed(String),
}

impl From<FrameError> for MuxError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Transport(err) => MuxError::Transport(err),
            other => MuxError::Frame(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, MuxError>;
