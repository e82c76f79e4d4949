use bytes::Bytes;

use crate::buffer::ChannelBuffer;
use crate::demux::MuxWriter;
use crate::error::{MuxError, Result};

/// Default chunk size for [`ChannelStream::read_to_end`].
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Forward-only stream over one channel of a multiplexed connection.
///
/// A stream can read when it is bound to an input buffer and write when it is
/// bound to an output channel. Operations outside its capabilities fail with
/// [`MuxError::Unsupported`] without touching the connection.
#[derive(Debug)]
pub struct ChannelStream {
    input: Option<ChannelBuffer>,
    output: Option<u8>,
    writer: MuxWriter,
}

impl ChannelStream {
    pub(crate) fn new(
        input: Option<ChannelBuffer>,
        output: Option<u8>,
        writer: MuxWriter,
    ) -> Result<Self> {
        if input.is_none() && output.is_none() {
            return Err(MuxError::Unsupported(
                "stream needs an input buffer or an output channel",
            ));
        }
        Ok(Self {
            input,
            output,
            writer,
        })
    }

    pub fn can_read(&self) -> bool {
        self.input.is_some()
    }

    pub fn can_write(&self) -> bool {
        self.output.is_some()
    }

    /// Channel this stream reads from, if any.
    pub fn input_channel(&self) -> Option<u8> {
        self.input.as_ref().map(ChannelBuffer::channel)
    }

    /// Channel this stream writes to, if any.
    pub fn output_channel(&self) -> Option<u8> {
        self.output
    }

    /// Read up to `max` bytes. An empty result means end-of-stream.
    ///
    /// A zero `max` is rejected so an empty result is never ambiguous.
    pub async fn read(&self, max: usize) -> Result<Bytes> {
        let buffer = self.buffer()?;
        if max == 0 {
            return Err(MuxError::Unsupported("zero-length read"));
        }
        buffer.read(max).await
    }

    /// Read into `buf`, returning the number of bytes copied (0 at end-of-stream).
    /// An empty `buf` fails like a zero-length [`read`](Self::read).
    pub async fn read_into(&self, buf: &mut [u8]) -> Result<usize> {
        let bytes = self.read(buf.len()).await?;
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    /// Read until end-of-stream.
    pub async fn read_to_end(&self) -> Result<Vec<u8>> {
        let buffer = self.buffer()?;
        let mut out = Vec::new();
        loop {
            let chunk = buffer.read(READ_CHUNK_SIZE).await?;
            if chunk.is_empty() {
                return Ok(out);
            }
            out.extend_from_slice(&chunk);
        }
    }

    /// Send `data` as one frame on the bound output channel.
    pub async fn write(&self, data: &[u8]) -> Result<()> {
        let channel = self
            .output
            .ok_or(MuxError::Unsupported("stream is not writable"))?;
        self.writer.write(channel, data).await
    }

    fn buffer(&self) -> Result<&ChannelBuffer> {
        self.input
            .as_ref()
            .ok_or(MuxError::Unsupported("stream is not readable"))
    }
}

#[cfg(test)]
mod tests {
    use kstream_frame::{Framing, STDIN, STDOUT};
    use kstream_transport::memory_pair;

    use crate::demux::Demultiplexer;

    use super::*;

    fn demux() -> (Demultiplexer, kstream_transport::MemoryTransport) {
        let (local, remote) = memory_pair(16);
        let (rx, tx) = local.into_split();
        (Demultiplexer::new(rx, tx, Framing::Binary), remote)
    }

    #[tokio::test]
    async fn write_only_stream_rejects_reads() {
        let (mut demux, _remote) = demux();
        let stdin = demux.stream(None, Some(STDIN)).unwrap();

        assert!(!stdin.can_read());
        assert!(stdin.can_write());
        assert_eq!(stdin.output_channel(), Some(STDIN));
        assert!(matches!(stdin.read(8).await, Err(MuxError::Unsupported(_))));
        assert!(matches!(stdin.read_to_end().await, Err(MuxError::Unsupported(_))));
        let mut buf = [0u8; 4];
        assert!(matches!(
            stdin.read_into(&mut buf).await,
            Err(MuxError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn read_only_stream_rejects_writes() {
        let (mut demux, _remote) = demux();
        let stdout = demux.stream(Some(STDOUT), None).unwrap();

        assert!(stdout.can_read());
        assert!(!stdout.can_write());
        assert_eq!(stdout.input_channel(), Some(STDOUT));
        assert!(matches!(
            stdout.write(b"nope").await,
            Err(MuxError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn zero_length_read_is_rejected_on_live_stream() {
        let (mut demux, _remote) = demux();
        let stdout = demux.stream(Some(STDOUT), None).unwrap();
        demux.start().unwrap();

        stdout.input.as_ref().unwrap().append(b"kept");
        assert!(matches!(stdout.read(0).await, Err(MuxError::Unsupported(_))));
        assert!(matches!(
            stdout.read_into(&mut []).await,
            Err(MuxError::Unsupported(_))
        ));
        assert_eq!(stdout.read(16).await.unwrap().as_ref(), b"kept");
    }

    #[tokio::test]
    async fn read_into_copies_available_bytes() {
        let (mut demux, _remote) = demux();
        let stdout = demux.stream(Some(STDOUT), None).unwrap();
        demux.start().unwrap();

        stdout.input.as_ref().unwrap().append(b"abcdef");
        let mut buf = [0u8; 4];
        assert_eq!(stdout.read_into(&mut buf).await.unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(stdout.read_into(&mut buf).await.unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
    }
}
