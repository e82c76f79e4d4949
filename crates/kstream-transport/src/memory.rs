use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{Message, MessageSink, MessageSource};

/// Default number of in-flight messages per direction.
pub const DEFAULT_MEMORY_CAPACITY: usize = 64;

/// One end of an in-process duplex connection.
///
/// Created in pairs by [`memory_pair`]; whatever one end sends, the other
/// receives, message boundaries preserved.
#[derive(Debug)]
pub struct MemoryTransport {
    source: MemorySource,
    sink: MemorySink,
}

impl MemoryTransport {
    /// Split into independently owned receive and send halves.
    pub fn into_split(self) -> (MemorySource, MemorySink) {
        (self.source, self.sink)
    }
}

/// Receive half of a [`MemoryTransport`].
#[derive(Debug)]
pub struct MemorySource {
    rx: mpsc::Receiver<Message>,
}

impl MemorySource {
    /// A source that yields `messages` in order and then reports closure.
    pub fn from_messages(messages: impl IntoIterator<Item = Message>) -> Self {
        let messages: Vec<Message> = messages.into_iter().collect();
        let (tx, rx) = mpsc::channel(messages.len().max(1));
        for message in messages {
            // Capacity matches the message count, so this cannot fail.
            let _ = tx.try_send(message);
        }
        Self { rx }
    }
}

#[async_trait]
impl MessageSource for MemorySource {
    async fn recv(&mut self) -> Result<Option<Message>> {
        Ok(self.rx.recv().await)
    }
}

/// Send half of a [`MemoryTransport`].
#[derive(Debug)]
pub struct MemorySink {
    tx: Option<mpsc::Sender<Message>>,
}

#[async_trait]
impl MessageSink for MemorySink {
    async fn send(&mut self, message: Message) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(message).await.map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) -> Result<()> {
        if self.tx.take().is_some() {
            debug!("memory transport send half closed");
        }
        Ok(())
    }
}

/// Create a connected pair of in-process transports.
pub fn memory_pair(capacity: usize) -> (MemoryTransport, MemoryTransport) {
    let capacity = capacity.max(1);
    let (left_tx, right_rx) = mpsc::channel(capacity);
    let (right_tx, left_rx) = mpsc::channel(capacity);

    let left = MemoryTransport {
        source: MemorySource { rx: left_rx },
        sink: MemorySink { tx: Some(left_tx) },
    };
    let right = MemoryTransport {
        source: MemorySource { rx: right_rx },
        sink: MemorySink { tx: Some(right_tx) },
    };
    (left, right)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[tokio::test]
    async fn pair_delivers_in_both_directions() {
        let (left, right) = memory_pair(DEFAULT_MEMORY_CAPACITY);
        let (mut left_rx, mut left_tx) = left.into_split();
        let (mut right_rx, mut right_tx) = right.into_split();

        left_tx
            .send(Message::Binary(Bytes::from_static(b"\x00ping")))
            .await
            .unwrap();
        right_tx.send(Message::Text("1cG9uZw==".into())).await.unwrap();

        assert_eq!(
            right_rx.recv().await.unwrap(),
            Some(Message::Binary(Bytes::from_static(b"\x00ping")))
        );
        assert_eq!(
            left_rx.recv().await.unwrap(),
            Some(Message::Text("1cG9uZw==".into()))
        );
    }

    #[tokio::test]
    async fn close_ends_peer_source() {
        let (left, right) = memory_pair(1);
        let (_left_rx, mut left_tx) = left.into_split();
        let (mut right_rx, _right_tx) = right.into_split();

        left_tx.close().await.unwrap();
        left_tx.close().await.unwrap();

        assert_eq!(right_rx.recv().await.unwrap(), None);
        let err = left_tx.send(Message::Text("0".into())).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[tokio::test]
    async fn from_messages_replays_then_closes() {
        let mut source = MemorySource::from_messages(vec![
            Message::Text("1YQ==".into()),
            Message::Text("2Yg==".into()),
        ]);

        assert_eq!(
            source.recv().await.unwrap(),
            Some(Message::Text("1YQ==".into()))
        );
        assert_eq!(
            source.recv().await.unwrap(),
            Some(Message::Text("2Yg==".into()))
        );
        assert_eq!(source.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_replay_is_closed_immediately() {
        let mut source = MemorySource::from_messages(Vec::new());
        assert_eq!(source.recv().await.unwrap(), None);
    }
}
