//! Channel-prefixed framing for the exec/attach streaming protocol.
//!
//! Every transport message carries exactly one frame:
//! - `channel.k8s.io`: a binary message `[channel byte][payload]`
//! - `base64.channel.k8s.io`: a text message `<channel digit><base64 payload>`
//!
//! The framing is chosen once per connection from the negotiated sub-protocol.

pub mod channel;
pub mod codec;
pub mod error;
pub mod protocol;
pub mod reader;
pub mod writer;

pub use channel::{channel_name, ERROR, RESIZE, STDERR, STDIN, STDOUT};
pub use codec::{
    decode_base64, decode_binary, encode_base64, encode_binary, ChannelCodec, Frame, FrameConfig,
    DEFAULT_MAX_PAYLOAD,
};
pub use error::{FrameError, Result};
pub use protocol::{Framing, SubProtocol, SUPPORTED_PROTOCOLS};
pub use reader::FrameReader;
pub use writer::FrameWriter;
