use kstream_transport::TransportError;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A message arrived with no channel prefix at all.
    #[error("empty frame (missing channel prefix)")]
    EmptyFrame,

    /// The leading character of a text frame does not encode a channel.
    #[error("invalid channel prefix {0:?}")]
    InvalidChannel(char),

    /// A text frame carried a payload that is not valid base64.
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// A text frame arrived as binary data that is not UTF-8.
    #[error("text frame is not valid UTF-8")]
    InvalidUtf8,

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The negotiated sub-protocol is not one this crate can frame.
    #[error("unsupported sub-protocol {0:?}")]
    UnsupportedProtocol(String),

    /// The underlying transport failed while sending or receiving.
    #[error("frame transport error: {0}")]
    Transport(#[from] TransportError),
}

impl FrameError {
    /// True when the error comes from the wire contents rather than the connection.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            FrameError::EmptyFrame
                | FrameError::InvalidChannel(_)
                | FrameError::InvalidBase64(_)
                | FrameError::InvalidUtf8
                | FrameError::PayloadTooLarge { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
