use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::{Result, WatchError};

/// Default maximum line length: 16 MiB.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;

const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;

/// Configuration for [`LineReader`].
#[derive(Debug, Clone)]
pub struct LineReaderConfig {
    /// Longest accepted line, excluding the terminator.
    pub max_line_length: usize,
    /// Bytes requested from the source per read.
    pub read_chunk_size: usize,
}

impl Default for LineReaderConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

/// Splits a byte source into lines terminated by `\n` or `\r\n`.
///
/// Partial reads are buffered across calls. A trailing line without a
/// terminator is returned before end-of-stream.
pub struct LineReader<R> {
    inner: R,
    buf: BytesMut,
    // Bytes of `buf` already known to contain no newline.
    scanned: usize,
    eof: bool,
    config: LineReaderConfig,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Create a line reader with default configuration.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, LineReaderConfig::default())
    }

    /// Create a line reader with explicit configuration.
    pub fn with_config(inner: R, config: LineReaderConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(config.read_chunk_size),
            scanned: 0,
            eof: false,
            config,
        }
    }

    /// Read the next line without its terminator.
    ///
    /// Returns `Ok(None)` at end-of-stream, and keeps returning it on later
    /// calls. If `cancel` fires while waiting on the source the read is
    /// abandoned with [`WatchError::Cancelled`].
    pub async fn read_line(&mut self, cancel: &CancellationToken) -> Result<Option<String>> {
        loop {
            if let Some(pos) = self.buf[self.scanned..].iter().position(|b| *b == b'\n') {
                let end = self.scanned + pos;
                let mut line = self.buf.split_to(end + 1);
                line.truncate(end);
                self.scanned = 0;
                return self.finish_line(line).map(Some);
            }
            self.scanned = self.buf.len();
            self.check_length(self.buf.len())?;

            if self.eof {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let line = self.buf.split();
                self.scanned = 0;
                return self.finish_line(line).map(Some);
            }

            self.buf.reserve(self.config.read_chunk_size);
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(WatchError::Cancelled),
                read = self.inner.read_buf(&mut self.buf) => read?,
            };
            trace!(size = read, "watch body read");
            if read == 0 {
                self.eof = true;
            }
        }
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the reader and return the inner source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn check_length(&self, len: usize) -> Result<()> {
        if len > self.config.max_line_length {
            return Err(WatchError::LineTooLong {
                len,
                max: self.config.max_line_length,
            });
        }
        Ok(())
    }

    fn finish_line(&self, mut line: BytesMut) -> Result<String> {
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        self.check_length(line.len())?;
        String::from_utf8(line.to_vec()).map_err(|_| WatchError::InvalidUtf8)
    }
}

impl<S, E> LineReader<StreamReader<S, Bytes>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: Into<std::io::Error>,
{
    /// Line reader over a chunked response body.
    pub fn from_body(body: S) -> Self {
        Self::new(StreamReader::new(body))
    }
}
