use kstream_transport::MessageSink;
use tracing::trace;

use crate::codec::{ChannelCodec, Frame};
use crate::error::Result;
use crate::protocol::Framing;

/// Writes complete frames to any [`MessageSink`].
pub struct FrameWriter<S> {
    inner: S,
    codec: ChannelCodec,
}

impl<S: MessageSink> FrameWriter<S> {
    /// Create a new frame writer with default codec configuration.
    pub fn new(inner: S, framing: Framing) -> Self {
        Self::with_codec(inner, ChannelCodec::new(framing))
    }

    /// Create a new frame writer with an explicit codec.
    pub fn with_codec(inner: S, codec: ChannelCodec) -> Self {
        Self { inner, codec }
    }

    /// Write a complete frame.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.channel, frame.payload.as_ref()).await
    }

    /// Encode and send a payload on a channel as one message.
    pub async fn send(&mut self, channel: u8, payload: &[u8]) -> Result<()> {
        let message = self.codec.encode(channel, payload)?;
        self.inner.send(message).await?;
        trace!(channel, size = payload.len(), "frame sent");
        Ok(())
    }

    /// Close the underlying sink.
    pub async fn close(&mut self) -> Result<()> {
        self.inner.close().await?;
        Ok(())
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the writer and return the inner sink.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Codec used to encode frames.
    pub fn codec(&self) -> &ChannelCodec {
        &self.codec
    }
}

#[cfg(test)]
mod tests {
    use kstream_transport::{memory_pair, Message, MessageSource, TransportError};

    use super::*;
    use crate::codec::FrameConfig;
    use crate::error::FrameError;
    use crate::reader::FrameReader;

    #[tokio::test]
    async fn written_frames_decode_on_the_peer() {
        let (left, right) = memory_pair(8);
        let (_left_rx, left_tx) = left.into_split();
        let (right_rx, _right_tx) = right.into_split();

        let mut writer = FrameWriter::new(left_tx, Framing::Base64);
        let mut reader = FrameReader::new(right_rx, Framing::Base64);

        writer.send(0, b"ls -l\n").await.unwrap();
        writer.write_frame(&Frame::new(4, "{}")).await.unwrap();

        let f1 = reader.read_frame().await.unwrap().unwrap();
        let f2 = reader.read_frame().await.unwrap().unwrap();
        assert_eq!((f1.channel, f1.payload.as_ref()), (0, b"ls -l\n".as_ref()));
        assert_eq!((f2.channel, f2.payload.as_ref()), (4, b"{}".as_ref()));
    }

    #[tokio::test]
    async fn binary_writer_emits_binary_messages() {
        let (left, right) = memory_pair(8);
        let (_left_rx, left_tx) = left.into_split();
        let (mut right_rx, _right_tx) = right.into_split();

        let mut writer = FrameWriter::new(left_tx, Framing::Binary);
        writer.send(1, b"data").await.unwrap();

        let message = right_rx.recv().await.unwrap().unwrap();
        assert!(matches!(message, Message::Binary(ref b) if b.as_ref() == b"\x01data"));
    }

    #[tokio::test]
    async fn payload_too_large_rejected_before_send() {
        let (left, _right) = memory_pair(1);
        let (_rx, tx) = left.into_split();
        let codec = ChannelCodec::with_config(
            Framing::Binary,
            FrameConfig {
                max_payload_size: 2,
            },
        );
        let mut writer = FrameWriter::with_codec(tx, codec);

        let err = writer.send(0, b"abc").await.unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[tokio::test]
    async fn send_after_close_reports_transport_error() {
        let (left, _right) = memory_pair(1);
        let (_rx, tx) = left.into_split();
        let mut writer = FrameWriter::new(tx, Framing::Binary);

        writer.close().await.unwrap();
        let err = writer.send(0, b"x").await.unwrap_err();
        assert!(matches!(err, FrameError::Transport(TransportError::Closed)));
        let _ = writer.get_ref();
        let _ = writer.get_mut();
        assert_eq!(writer.codec().framing(), Framing::Binary);
        let _inner = writer.into_inner();
    }
}
