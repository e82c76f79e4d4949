use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::io::AsyncRead;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::WatchError;
use crate::event::{decode_line, EventType};
use crate::line::LineReader;

type EventCallback<T> = Box<dyn FnMut(EventType, T) + Send>;
type ErrorCallback = Box<dyn FnMut(WatchError) + Send>;
type ClosedCallback = Box<dyn FnOnce() + Send>;

/// Lifecycle of a [`Watcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WatchState {
    /// Spawned, loop not yet polled.
    Created = 0,
    Running = 1,
    /// The body ended or the watch was stopped.
    Closed = 2,
    /// A transport failure or cancellation ended the watch.
    Faulted = 3,
}

impl WatchState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WatchState::Created,
            1 => WatchState::Running,
            2 => WatchState::Closed,
            _ => WatchState::Faulted,
        }
    }
}

struct Shared {
    state: AtomicU8,
    stopped: AtomicBool,
    cancel: CancellationToken,
}

impl Shared {
    fn state(&self) -> WatchState {
        WatchState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: WatchState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

/// Configures and starts a [`Watcher`].
pub struct WatcherBuilder<R, T> {
    reader: LineReader<R>,
    on_event: EventCallback<T>,
    on_error: Option<ErrorCallback>,
    on_closed: Option<ClosedCallback>,
    cancel: CancellationToken,
}

impl<R, T> WatcherBuilder<R, T>
where
    R: AsyncRead + Unpin + Send + 'static,
    T: DeserializeOwned + Send + 'static,
{
    /// Called for per-line failures, ERROR events and the fatal error that
    /// ends the watch. Without it errors are only logged.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnMut(WatchError) + Send + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Called once when the body ends cleanly.
    pub fn on_closed<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_closed = Some(Box::new(f));
        self
    }

    /// Tie the watch to an outer cancellation token.
    ///
    /// Cancelling the outer token faults the watch; [`Watcher::stop`] ends it
    /// silently.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Spawn the watch loop on the current tokio runtime.
    pub fn start(self) -> Watcher {
        let shared = Arc::new(Shared {
            state: AtomicU8::new(WatchState::Created as u8),
            stopped: AtomicBool::new(false),
            cancel: self.cancel.child_token(),
        });
        let callbacks = Callbacks {
            on_event: self.on_event,
            on_error: self.on_error,
            on_closed: self.on_closed,
        };
        let task = tokio::spawn(watch_loop(self.reader, callbacks, Arc::clone(&shared)));
        Watcher {
            shared,
            task: Some(task),
        }
    }
}

impl<R, T> fmt::Debug for WatcherBuilder<R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherBuilder")
            .field("on_error", &self.on_error.is_some())
            .field("on_closed", &self.on_closed.is_some())
            .finish_non_exhaustive()
    }
}

/// Handle to a running watch loop.
///
/// Dropping the handle stops the watch.
pub struct Watcher {
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl Watcher {
    /// Begin configuring a watch over `reader`, delivering decoded objects to
    /// `on_event` in arrival order.
    pub fn builder<R, T, F>(reader: LineReader<R>, on_event: F) -> WatcherBuilder<R, T>
    where
        R: AsyncRead + Unpin + Send + 'static,
        T: DeserializeOwned + Send + 'static,
        F: FnMut(EventType, T) + Send + 'static,
    {
        WatcherBuilder {
            reader,
            on_event: Box::new(on_event),
            on_error: None,
            on_closed: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> WatchState {
        self.shared.state()
    }

    /// True until the loop reaches `Closed` or `Faulted`.
    pub fn is_watching(&self) -> bool {
        matches!(self.state(), WatchState::Created | WatchState::Running)
    }

    /// Stop the watch. Idempotent; no callback runs once the loop observes it.
    pub fn stop(&self) {
        if !self.shared.stopped.swap(true, Ordering::AcqRel) {
            debug!("watch stop requested");
        }
        self.shared.cancel.cancel();
    }

    /// Wait for the loop to exit and return its final state.
    pub async fn join(mut self) -> WatchState {
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "watch task aborted");
                self.shared.set_state(WatchState::Faulted);
            }
        }
        self.shared.state()
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.stop();
        }
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("state", &self.state())
            .field("stopped", &self.shared.is_stopped())
            .finish()
    }
}

struct Callbacks<T> {
    on_event: EventCallback<T>,
    on_error: Option<ErrorCallback>,
    on_closed: Option<ClosedCallback>,
}

impl<T> Callbacks<T> {
    fn error(&mut self, err: WatchError) {
        match self.on_error.as_mut() {
            Some(on_error) => on_error(err),
            None => warn!(error = %err, "unhandled watch error"),
        }
    }
}

async fn watch_loop<R, T>(
    mut reader: LineReader<R>,
    mut callbacks: Callbacks<T>,
    shared: Arc<Shared>,
) where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    shared.set_state(WatchState::Running);
    let mut events: u64 = 0;

    loop {
        let line = reader.read_line(&shared.cancel).await;
        if shared.is_stopped() {
            debug!(events, "watch stopped");
            shared.set_state(WatchState::Closed);
            return;
        }
        // Lines already buffered are not delivered once the outer token fires.
        let line = if shared.cancel.is_cancelled() {
            Err(WatchError::Cancelled)
        } else {
            line
        };

        match line {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match decode_line::<T>(&line) {
                    Ok((event_type, object)) => {
                        events += 1;
                        (callbacks.on_event)(event_type, object);
                    }
                    Err(err) => callbacks.error(err),
                }
            }
            Ok(None) => {
                debug!(events, "watch closed");
                shared.set_state(WatchState::Closed);
                if let Some(on_closed) = callbacks.on_closed.take() {
                    on_closed();
                }
                return;
            }
            Err(err) if !err.is_terminal() => callbacks.error(err),
            Err(err) => {
                warn!(error = %err, events, "watch failed");
                shared.set_state(WatchState::Faulted);
                callbacks.error(err);
                return;
            }
        }
    }
}
