use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use kstream_transport::Message;

use crate::error::{FrameError, Result};
use crate::protocol::Framing;

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Channel index zero is carried as the character `'0'` in text frames.
const CHANNEL_DIGIT_BASE: u32 = b'0' as u32;

/// A decoded frame with channel routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The channel this payload belongs to.
    pub channel: u8,
    /// The payload, possibly empty.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(channel: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            channel,
            payload: payload.into(),
        }
    }
}

/// Encode a binary frame.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────────┐
/// │ Channel (1B) │ Payload (rest)   │
/// └──────────────┴──────────────────┘
/// ```
pub fn encode_binary(channel: u8, payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(1 + payload.len());
    dst.put_u8(channel);
    dst.put_slice(payload);
}

/// Decode a binary frame. The whole message is one frame.
pub fn decode_binary(mut src: Bytes) -> Result<Frame> {
    if src.is_empty() {
        return Err(FrameError::EmptyFrame);
    }
    let channel = src.get_u8();
    Ok(Frame {
        channel,
        payload: src,
    })
}

/// Encode a text frame: channel digit followed by the base64 payload.
pub fn encode_base64(channel: u8, payload: &[u8]) -> String {
    let mut out = String::with_capacity(1 + payload.len().div_ceil(3) * 4);
    out.push(channel_char(channel));
    STANDARD.encode_string(payload, &mut out);
    out
}

/// Decode a text frame. The remainder after the channel digit must be valid base64.
pub fn decode_base64(text: &str) -> Result<Frame> {
    let mut chars = text.chars();
    let first = chars.next().ok_or(FrameError::EmptyFrame)?;
    let channel = channel_from_char(first)?;
    let payload = STANDARD.decode(chars.as_str())?;
    Ok(Frame {
        channel,
        payload: Bytes::from(payload),
    })
}

fn channel_char(channel: u8) -> char {
    // '0' + 255 is U+012F, always a valid scalar value.
    char::from_u32(CHANNEL_DIGIT_BASE + u32::from(channel)).unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn channel_from_char(c: char) -> Result<u8> {
    (c as u32)
        .checked_sub(CHANNEL_DIGIT_BASE)
        .and_then(|n| u8::try_from(n).ok())
        .ok_or(FrameError::InvalidChannel(c))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// Frame codec bound to one connection's negotiated framing.
#[derive(Debug, Clone)]
pub struct ChannelCodec {
    framing: Framing,
    config: FrameConfig,
}

impl ChannelCodec {
    /// Create a codec with default configuration.
    pub fn new(framing: Framing) -> Self {
        Self::with_config(framing, FrameConfig::default())
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(framing: Framing, config: FrameConfig) -> Self {
        Self { framing, config }
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Current codec configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Encode a payload for `channel` into one transport message.
    pub fn encode(&self, channel: u8, payload: &[u8]) -> Result<Message> {
        self.check_size(payload.len())?;
        match self.framing {
            Framing::Binary => {
                let mut buf = BytesMut::new();
                encode_binary(channel, payload, &mut buf);
                Ok(Message::Binary(buf.freeze()))
            }
            Framing::Base64 => Ok(Message::Text(encode_base64(channel, payload))),
        }
    }

    /// Decode one transport message into a frame.
    pub fn decode(&self, message: Message) -> Result<Frame> {
        let frame = match (self.framing, message) {
            (Framing::Binary, Message::Binary(bytes)) => decode_binary(bytes)?,
            (Framing::Binary, Message::Text(text)) => decode_binary(Bytes::from(text))?,
            (Framing::Base64, Message::Text(text)) => decode_base64(&text)?,
            (Framing::Base64, Message::Binary(bytes)) => {
                let text = std::str::from_utf8(&bytes).map_err(|_| FrameError::InvalidUtf8)?;
                decode_base64(text)?
            }
        };
        self.check_size(frame.payload.len())?;
        Ok(frame)
    }

    fn check_size(&self, size: usize) -> Result<()> {
        if size > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size,
                max: self.config.max_payload_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_of(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn test_roundtrip_every_channel_both_framings() {
        for framing in [Framing::Binary, Framing::Base64] {
            let codec = ChannelCodec::new(framing);
            for channel in 0..=u8::MAX {
                for len in [0usize, 1, 1024] {
                    let payload = payload_of(len);
                    let message = codec.encode(channel, &payload).unwrap();
                    let frame = codec.decode(message).unwrap();
                    assert_eq!(frame.channel, channel, "{framing:?} channel {channel}");
                    assert_eq!(frame.payload.as_ref(), payload.as_slice());
                }
            }
        }
    }

    #[test]
    fn test_binary_wire_layout() {
        let mut buf = BytesMut::new();
        encode_binary(2, b"oops", &mut buf);
        assert_eq!(buf.as_ref(), b"\x02oops");
    }

    #[test]
    fn test_base64_wire_layout() {
        assert_eq!(encode_base64(1, b"hello"), "1aGVsbG8=");
        let frame = decode_base64("1aGVsbG8=").unwrap();
        assert_eq!(frame, Frame::new(1, Bytes::from_static(b"hello")));
    }

    #[test]
    fn test_empty_payload_is_valid() {
        let frame = decode_binary(Bytes::from_static(b"\x01")).unwrap();
        assert_eq!(frame.channel, 1);
        assert!(frame.payload.is_empty());

        let frame = decode_base64("2").unwrap();
        assert_eq!(frame.channel, 2);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_empty_message_rejected() {
        assert!(matches!(
            decode_binary(Bytes::new()),
            Err(FrameError::EmptyFrame)
        ));
        assert!(matches!(decode_base64(""), Err(FrameError::EmptyFrame)));
    }

    #[test]
    fn test_invalid_base64_is_protocol_violation() {
        let err = decode_base64("1not*base64").unwrap_err();
        assert!(matches!(err, FrameError::InvalidBase64(_)));
        assert!(err.is_protocol_violation());
    }

    #[test]
    fn test_invalid_channel_character() {
        let err = decode_base64(" aGk=").unwrap_err();
        assert!(matches!(err, FrameError::InvalidChannel(' ')));

        let beyond = char::from_u32(CHANNEL_DIGIT_BASE + 256).unwrap();
        let err = decode_base64(&format!("{beyond}aGk=")).unwrap_err();
        assert!(matches!(err, FrameError::InvalidChannel(c) if c == beyond));
    }

    #[test]
    fn test_base64_accepts_utf8_binary_message() {
        let codec = ChannelCodec::new(Framing::Base64);
        let frame = codec
            .decode(Message::Binary(Bytes::from_static(b"1aGk=")))
            .unwrap();
        assert_eq!(frame.payload.as_ref(), b"hi");

        let err = codec
            .decode(Message::Binary(Bytes::from_static(b"\xff\xfe")))
            .unwrap_err();
        assert!(matches!(err, FrameError::InvalidUtf8));
    }

    #[test]
    fn test_payload_too_large() {
        let codec = ChannelCodec::with_config(
            Framing::Binary,
            FrameConfig {
                max_payload_size: 4,
            },
        );
        let err = codec.encode(1, b"oversized").unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 9, max: 4 }));

        let err = codec
            .decode(Message::Binary(Bytes::from_static(b"\x01oversized")))
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn test_codec_selects_message_kind() {
        let binary = ChannelCodec::new(Framing::Binary).encode(0, b"x").unwrap();
        let text = ChannelCodec::new(Framing::Base64).encode(0, b"x").unwrap();
        assert!(matches!(binary, Message::Binary(_)));
        assert!(matches!(text, Message::Text(ref t) if t == "0eA=="));
    }
}
