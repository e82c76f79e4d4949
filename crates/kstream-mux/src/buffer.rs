use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::{Bytes, BytesMut};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::{MuxError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Why a buffer stopped accepting bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EndReason {
    /// The connection closed cleanly: drained reads return end-of-stream.
    Closed,
    /// The receive loop failed: drained reads return the failure.
    Failed(String),
    /// The run was cancelled: reads return `Cancelled` and queued bytes are discarded.
    Cancelled,
}

struct State {
    data: BytesMut,
    end: Option<EndReason>,
    appended: u64,
}

struct Inner {
    channel: u8,
    state: Mutex<State>,
    readable: Notify,
}

/// Unbounded byte queue holding what arrived for one channel.
///
/// The receive loop is the only producer. Reads return whatever is queued,
/// up to the requested size, and suspend while the queue is empty and the
/// buffer has not ended.
#[derive(Clone)]
pub struct ChannelBuffer {
    inner: Arc<Inner>,
}

impl ChannelBuffer {
    pub fn new(channel: u8) -> Self {
        Self {
            inner: Arc::new(Inner {
                channel,
                state: Mutex::new(State {
                    data: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
                    end: None,
                    appended: 0,
                }),
                readable: Notify::new(),
            }),
        }
    }

    /// Channel index this buffer collects.
    pub fn channel(&self) -> u8 {
        self.inner.channel
    }

    /// Queue bytes for readers. Bytes arriving after the buffer ended are dropped.
    pub fn append(&self, bytes: &[u8]) {
        {
            let mut state = self.state();
            if state.end.is_some() {
                trace!(
                    channel = self.inner.channel,
                    size = bytes.len(),
                    "append after end ignored"
                );
                return;
            }
            state.data.extend_from_slice(bytes);
            state.appended += bytes.len() as u64;
        }
        self.inner.readable.notify_waiters();
    }

    /// Signal end-of-stream. Idempotent; releases blocked readers.
    pub fn mark_ended(&self) {
        self.end_with(EndReason::Closed);
    }

    pub(crate) fn end_with(&self, reason: EndReason) {
        {
            let mut state = self.state();
            if state.end.is_none() {
                state.end = Some(reason);
            }
        }
        self.inner.readable.notify_waiters();
    }

    /// True once the buffer stopped accepting bytes.
    pub fn is_ended(&self) -> bool {
        self.state().end.is_some()
    }

    /// Bytes queued and not yet read.
    pub fn available(&self) -> usize {
        self.state().data.len()
    }

    /// Total bytes appended over the buffer's lifetime.
    pub fn total_appended(&self) -> u64 {
        self.state().appended
    }

    /// Read between 1 and `max` bytes, suspending until some are available.
    ///
    /// Returns an empty buffer once the buffer ended cleanly and is drained.
    /// When the connection failed, the drained buffer reports the failure.
    /// After cancellation every read fails with `Cancelled`, even with bytes
    /// still queued. A zero `max` returns an empty buffer without waiting.
    pub async fn read(&self, max: usize) -> Result<Bytes> {
        loop {
            let notified = self.inner.readable.notified();
            tokio::pin!(notified);
            // Register before inspecting state so an append in between is not missed.
            notified.as_mut().enable();

            if let Some(result) = self.try_read(max) {
                return result;
            }
            notified.await;
        }
    }

    /// Like [`read`](Self::read), but gives up with `Cancelled` when `cancel` fires.
    pub async fn read_cancellable(&self, max: usize, cancel: &CancellationToken) -> Result<Bytes> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(MuxError::Cancelled),
            result = self.read(max) => result,
        }
    }

    fn try_read(&self, max: usize) -> Option<Result<Bytes>> {
        if max == 0 {
            return Some(Ok(Bytes::new()));
        }
        let mut state = self.state();
        if state.end == Some(EndReason::Cancelled) {
            return Some(Err(MuxError::Cancelled));
        }
        if !state.data.is_empty() {
            let n = max.min(state.data.len());
            return Some(Ok(state.data.split_to(n).freeze()));
        }
        match &state.end {
            None => None,
            Some(EndReason::Closed) => Some(Ok(Bytes::new())),
            Some(EndReason::Failed(message)) => Some(Err(MuxError::ConnectionLost(message.clone()))),
            Some(EndReason::Cancelled) => Some(Err(MuxError::Cancelled)),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ChannelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("ChannelBuffer")
            .field("channel", &self.inner.channel)
            .field("available", &state.data.len())
            .field("end", &state.end)
            .finish()
    }
}
