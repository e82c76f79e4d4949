use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// One message on a message-oriented duplex connection.
///
/// The binary channel protocol travels in [`Message::Binary`]; the base64
/// variant travels in [`Message::Text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Binary(Bytes),
    Text(String),
}

impl Message {
    /// Raw bytes of the message regardless of its kind.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Message::Binary(bytes) => bytes.as_ref(),
            Message::Text(text) => text.as_bytes(),
        }
    }

    /// Size of the message body in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short label for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Binary(_) => "binary",
            Message::Text(_) => "text",
        }
    }
}

/// Receive half of a duplex connection.
#[async_trait]
pub trait MessageSource: Send {
    /// Receive the next message.
    ///
    /// Returns `Ok(None)` once the connection has been closed cleanly. Any
    /// error is terminal for the connection.
    async fn recv(&mut self) -> Result<Option<Message>>;
}

/// Send half of a duplex connection.
#[async_trait]
pub trait MessageSink: Send {
    /// Send one complete message. Resolves once the transport accepted it.
    async fn send(&mut self, message: Message) -> Result<()>;

    /// Close the send half. Closing twice is not an error.
    async fn close(&mut self) -> Result<()>;
}

pub type BoxedSource = Box<dyn MessageSource>;
pub type BoxedSink = Box<dyn MessageSink>;

#[async_trait]
impl<S: MessageSource + ?Sized> MessageSource for Box<S> {
    async fn recv(&mut self) -> Result<Option<Message>> {
        (**self).recv().await
    }
}

#[async_trait]
impl<S: MessageSink + ?Sized> MessageSink for Box<S> {
    async fn send(&mut self, message: Message) -> Result<()> {
        (**self).send(message).await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_bytes_and_kind() {
        let binary = Message::Binary(Bytes::from_static(b"\x01hi"));
        let text = Message::Text("1aGk=".to_string());

        assert_eq!(binary.as_bytes(), b"\x01hi");
        assert_eq!(binary.kind(), "binary");
        assert_eq!(text.len(), 5);
        assert_eq!(text.kind(), "text");
        assert!(Message::Text(String::new()).is_empty());
    }
}
