use kstream_transport::MessageSource;
use tracing::trace;

use crate::codec::{ChannelCodec, Frame};
use crate::error::Result;
use crate::protocol::Framing;

/// Reads complete frames from any [`MessageSource`].
///
/// Each transport message is exactly one frame, so there is no partial-frame
/// state to carry between calls.
pub struct FrameReader<S> {
    inner: S,
    codec: ChannelCodec,
}

impl<S: MessageSource> FrameReader<S> {
    /// Create a new frame reader with default codec configuration.
    pub fn new(inner: S, framing: Framing) -> Self {
        Self::with_codec(inner, ChannelCodec::new(framing))
    }

    /// Create a new frame reader with an explicit codec.
    pub fn with_codec(inner: S, codec: ChannelCodec) -> Self {
        Self { inner, codec }
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` once the connection has closed.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>> {
        let Some(message) = self.inner.recv().await? else {
            trace!("message source closed");
            return Ok(None);
        };
        let frame = self.codec.decode(message)?;
        trace!(
            channel = frame.channel,
            size = frame.payload.len(),
            "frame received"
        );
        Ok(Some(frame))
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the reader and return the inner source.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Codec used to decode frames.
    pub fn codec(&self) -> &ChannelCodec {
        &self.codec
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bytes::Bytes;
    use kstream_transport::{Message, MemorySource, TransportError};

    use super::*;
    use crate::error::FrameError;

    #[tokio::test]
    async fn read_frames_until_close() {
        let source = MemorySource::from_messages(vec![
            Message::Binary(Bytes::from_static(b"\x01one")),
            Message::Binary(Bytes::from_static(b"\x02two")),
        ]);
        let mut reader = FrameReader::new(source, Framing::Binary);

        let f1 = reader.read_frame().await.unwrap().unwrap();
        let f2 = reader.read_frame().await.unwrap().unwrap();

        assert_eq!((f1.channel, f1.payload.as_ref()), (1, b"one".as_ref()));
        assert_eq!((f2.channel, f2.payload.as_ref()), (2, b"two".as_ref()));
        assert!(reader.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn base64_frames_decode() {
        let source = MemorySource::from_messages(vec![Message::Text("1aGVsbG8=".into())]);
        let mut reader = FrameReader::new(source, Framing::Base64);

        let frame = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(frame.channel, 1);
        assert_eq!(frame.payload.as_ref(), b"hello");
    }

    #[tokio::test]
    async fn invalid_frame_is_an_error() {
        let source = MemorySource::from_messages(vec![Message::Text("1%%%".into())]);
        let mut reader = FrameReader::new(source, Framing::Base64);

        let err = reader.read_frame().await.unwrap_err();
        assert!(matches!(err, FrameError::InvalidBase64(_)));
    }

    struct FailingSource;

    #[async_trait]
    impl MessageSource for FailingSource {
        async fn recv(&mut self) -> kstream_transport::Result<Option<Message>> {
            Err(TransportError::failed("reset by peer"))
        }
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let mut reader = FrameReader::new(FailingSource, Framing::Binary);
        let err = reader.read_frame().await.unwrap_err();
        assert!(matches!(err, FrameError::Transport(TransportError::Failed(_))));
        assert!(!err.is_protocol_violation());
    }

    #[tokio::test]
    async fn accessors_and_into_inner() {
        let mut reader = FrameReader::new(MemorySource::from_messages(Vec::new()), Framing::Binary);
        assert_eq!(reader.codec().framing(), Framing::Binary);
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }
}
