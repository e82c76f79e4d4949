use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use serde::de::DeserializeOwned;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, WatchError};
use crate::event::EventType;
use crate::line::LineReader;
use crate::watcher::{WatchState, Watcher};

type Item<T> = Result<(EventType, T)>;

/// Watch events as a [`Stream`].
///
/// Per-line errors appear as `Err` items between events. A fatal error is
/// the last item; a clean end of the body simply ends the stream.
pub struct WatchStream<T> {
    rx: mpsc::UnboundedReceiver<Item<T>>,
    watcher: Watcher,
}

/// Start a watch over `reader` and expose it as a [`WatchStream`].
///
/// Cancelling `cancel` yields a final `Err(WatchError::Cancelled)`.
pub fn watch_stream<R, T>(reader: LineReader<R>, cancel: CancellationToken) -> WatchStream<T>
where
    R: AsyncRead + Unpin + Send + 'static,
    T: DeserializeOwned + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let errors = tx.clone();
    let watcher = Watcher::builder(reader, move |event_type, object: T| {
        let _ = tx.send(Ok((event_type, object)));
    })
    .on_error(move |err: WatchError| {
        let _ = errors.send(Err(err));
    })
    .cancellation(cancel)
    .start();

    WatchStream { rx, watcher }
}

impl<T> WatchStream<T> {
    /// Stop the underlying watch. Items already queued are still yielded.
    pub fn stop(&self) {
        self.watcher.stop();
    }

    pub fn state(&self) -> WatchState {
        self.watcher.state()
    }
}

impl<T> Stream for WatchStream<T> {
    type Item = Item<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl<T> std::fmt::Debug for WatchStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchStream")
            .field("watcher", &self.watcher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::time::Duration;

    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Node {
        name: String,
    }

    async fn next<T>(stream: &mut WatchStream<T>) -> Option<Item<T>> {
        poll_fn(|cx| Pin::new(&mut *stream).poll_next(cx)).await
    }

    #[tokio::test]
    async fn yields_events_errors_then_ends() {
        let body: &'static [u8] = b"{\"type\":\"ADDED\",\"object\":{\"name\":\"n1\"}}\n\
            oops\n\
            {\"type\":\"BOOKMARK\",\"object\":{\"name\":\"n1\"}}\n";
        let mut stream = watch_stream::<_, Node>(LineReader::new(body), CancellationToken::new());

        let (event_type, node) = next(&mut stream).await.unwrap().unwrap();
        assert_eq!(event_type, EventType::Added);
        assert_eq!(node.name, "n1");
        assert!(matches!(
            next(&mut stream).await,
            Some(Err(WatchError::Parse { .. }))
        ));
        let (event_type, _) = next(&mut stream).await.unwrap().unwrap();
        assert_eq!(event_type, EventType::Bookmark);
        assert!(next(&mut stream).await.is_none());
        assert_eq!(stream.state(), WatchState::Closed);
    }

    #[tokio::test]
    async fn cancellation_is_the_last_item() {
        let (client, _server) = tokio::io::duplex(64);
        let cancel = CancellationToken::new();
        let mut stream = watch_stream::<_, Node>(LineReader::new(client), cancel.clone());

        cancel.cancel();
        let item = tokio::time::timeout(Duration::from_secs(1), next(&mut stream))
            .await
            .expect("stream should end promptly");
        assert!(matches!(item, Some(Err(WatchError::Cancelled))));
        assert!(next(&mut stream).await.is_none());
    }

    #[tokio::test]
    async fn stop_ends_stream_silently() {
        let (client, _server) = tokio::io::duplex(64);
        let mut stream = watch_stream::<_, Node>(LineReader::new(client), CancellationToken::new());

        stream.stop();
        let item = tokio::time::timeout(Duration::from_secs(1), next(&mut stream))
            .await
            .expect("stream should end promptly");
        assert!(item.is_none());
    }
}
