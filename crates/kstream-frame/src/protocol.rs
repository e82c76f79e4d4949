//! Sub-protocol negotiation.
//!
//! The client offers [`SUPPORTED_PROTOCOLS`] when the connection is upgraded
//! and the server picks one. The pick fixes the [`Framing`] for the lifetime
//! of the connection.

use std::fmt;
use std::str::FromStr;

use crate::error::FrameError;

/// Sub-protocol names in client preference order.
pub const SUPPORTED_PROTOCOLS: [&str; 4] = [
    SubProtocol::V4_CHANNEL,
    SubProtocol::V4_BASE64_CHANNEL,
    SubProtocol::CHANNEL,
    SubProtocol::BASE64_CHANNEL,
];

/// Wire encoding of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Framing {
    /// Binary message, first byte is the channel.
    Binary,
    /// Text message, first character is the channel digit, rest is base64.
    Base64,
}

impl Framing {
    pub fn is_text(self) -> bool {
        matches!(self, Framing::Base64)
    }
}

/// A negotiated streaming sub-protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubProtocol {
    Channel,
    Base64Channel,
    V4Channel,
    V4Base64Channel,
}

impl SubProtocol {
    pub const CHANNEL: &'static str = "channel.k8s.io";
    pub const BASE64_CHANNEL: &'static str = "base64.channel.k8s.io";
    pub const V4_CHANNEL: &'static str = "v4.channel.k8s.io";
    pub const V4_BASE64_CHANNEL: &'static str = "v4.base64.channel.k8s.io";

    /// Resolve the name the server selected.
    pub fn from_name(name: &str) -> Result<Self, FrameError> {
        match name.trim() {
            Self::CHANNEL => Ok(SubProtocol::Channel),
            Self::BASE64_CHANNEL => Ok(SubProtocol::Base64Channel),
            Self::V4_CHANNEL => Ok(SubProtocol::V4Channel),
            Self::V4_BASE64_CHANNEL => Ok(SubProtocol::V4Base64Channel),
            other => Err(FrameError::UnsupportedProtocol(other.to_string())),
        }
    }

    /// Wire name of the sub-protocol.
    pub fn name(self) -> &'static str {
        match self {
            SubProtocol::Channel => Self::CHANNEL,
            SubProtocol::Base64Channel => Self::BASE64_CHANNEL,
            SubProtocol::V4Channel => Self::V4_CHANNEL,
            SubProtocol::V4Base64Channel => Self::V4_BASE64_CHANNEL,
        }
    }

    /// Framing used on the wire for this sub-protocol.
    pub fn framing(self) -> Framing {
        match self {
            SubProtocol::Channel | SubProtocol::V4Channel => Framing::Binary,
            SubProtocol::Base64Channel | SubProtocol::V4Base64Channel => Framing::Base64,
        }
    }

    /// Value for the `Sec-WebSocket-Protocol` request header.
    pub fn offer_header() -> String {
        SUPPORTED_PROTOCOLS.join(", ")
    }
}

impl FromStr for SubProtocol {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for SubProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_names() {
        assert_eq!(
            SubProtocol::from_name("channel.k8s.io").unwrap(),
            SubProtocol::Channel
        );
        assert_eq!(
            "base64.channel.k8s.io".parse::<SubProtocol>().unwrap(),
            SubProtocol::Base64Channel
        );
        assert_eq!(
            SubProtocol::from_name(" v4.channel.k8s.io ").unwrap(),
            SubProtocol::V4Channel
        );
    }

    #[test]
    fn framing_follows_protocol_family() {
        assert_eq!(SubProtocol::Channel.framing(), Framing::Binary);
        assert_eq!(SubProtocol::V4Channel.framing(), Framing::Binary);
        assert_eq!(SubProtocol::Base64Channel.framing(), Framing::Base64);
        assert_eq!(SubProtocol::V4Base64Channel.framing(), Framing::Base64);
        assert!(Framing::Base64.is_text());
    }

    #[test]
    fn unknown_protocol_fails_fast() {
        let err = SubProtocol::from_name("v5.channel.k8s.io").unwrap_err();
        assert!(matches!(err, FrameError::UnsupportedProtocol(name) if name == "v5.channel.k8s.io"));
    }

    #[test]
    fn names_round_trip_through_display() {
        for name in SUPPORTED_PROTOCOLS {
            let protocol = SubProtocol::from_name(name).unwrap();
            assert_eq!(protocol.to_string(), name);
        }
        assert!(SubProtocol::offer_header().starts_with("v4.channel.k8s.io, "));
    }
}
