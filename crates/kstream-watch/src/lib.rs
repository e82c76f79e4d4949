//! Watch event streaming.
//!
//! A watch response is a long-lived body of newline-delimited JSON envelopes,
//! one `{"type": ..., "object": ...}` per line. [`LineReader`] splits the body
//! into lines, and [`Watcher`] decodes each line and dispatches it to caller
//! callbacks from a dedicated task. [`watch_stream`] offers the same events as
//! a `Stream`.

pub mod error;
pub mod event;
pub mod line;
pub mod stream;
pub mod watcher;

pub use error::{Result, WatchError};
pub use event::{EventType, Status, StatusCause, StatusDetails, WatchEnvelope};
pub use line::{LineReader, LineReaderConfig, DEFAULT_MAX_LINE_LENGTH};
pub use stream::{watch_stream, WatchStream};
pub use watcher::{WatchState, Watcher, WatcherBuilder};
