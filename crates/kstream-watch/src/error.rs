use crate::event::{EventType, Status};

/// Errors reported by the watch loop.
///
/// Per-line problems ([`is_terminal`](Self::is_terminal) is false) are reported
/// and the loop moves on to the next line.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The line is not a valid watch envelope.
    #[error("malformed watch event: {source}")]
    Parse {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    /// The envelope's object does not deserialize into the watched type.
    #[error("cannot decode {event_type} object: {source}")]
    Decode {
        event_type: EventType,
        #[source]
        source: serde_json::Error,
    },

    /// The server sent an ERROR event.
    #[error("watch error from server: {0}")]
    Status(Status),

    /// A line is not valid UTF-8.
    #[error("watch line is not valid UTF-8")]
    InvalidUtf8,

    /// A line exceeded the configured maximum length.
    #[error("watch line too long ({len} bytes, max {max})")]
    LineTooLong { len: usize, max: usize },

    /// Reading the response body failed.
    #[error("watch transport error: {0}")]
    Io(#[from] std::io::Error),

    /// The watch was cancelled while waiting for data.
    #[error("watch cancelled")]
    Cancelled,
}

impl WatchError {
    /// True when the error ends the watch.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WatchError::Io(_) | WatchError::Cancelled | WatchError::LineTooLong { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, WatchError>;
