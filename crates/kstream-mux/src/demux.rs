use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use bytes::Buf;
use kstream_frame::{ChannelCodec, FrameConfig, FrameReader, FrameWriter, Framing, RESIZE};
use kstream_transport::{BoxedSink, BoxedSource, MessageSink, MessageSource};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::buffer::{ChannelBuffer, EndReason};
use crate::control::TerminalSize;
use crate::error::{MuxError, Result};
use crate::stream::ChannelStream;

/// Port-forward streams open with the little-endian port number.
const PORT_PREFIX_LEN: usize = 2;

/// Demultiplexer configuration.
#[derive(Debug, Clone, Default)]
pub struct DemuxConfig {
    /// Codec limits applied to inbound and outbound frames.
    pub frame: FrameConfig,
    /// Strip the port prefix from the first frame of every channel.
    pub port_forward: bool,
}

/// Serialized send path shared by every stream of one connection.
///
/// Each call encodes and sends exactly one frame while holding the write
/// lock, so concurrent writers never interleave on the wire.
#[derive(Clone)]
pub struct MuxWriter {
    inner: Arc<AsyncMutex<FrameWriter<BoxedSink>>>,
    cancel: CancellationToken,
}

impl MuxWriter {
    /// Send `payload` as one frame on `channel`.
    pub async fn write(&self, channel: u8, payload: &[u8]) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(MuxError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(MuxError::Cancelled),
            result = async {
                let mut writer = self.inner.lock().await;
                writer.send(channel, payload).await
            } => result.map_err(MuxError::from),
        }
    }

    /// Send a terminal resize event on the RESIZE channel.
    pub async fn resize(&self, width: u16, height: u16) -> Result<()> {
        let payload = serde_json::to_vec(&TerminalSize::new(width, height))?;
        self.write(RESIZE, &payload).await
    }

    /// Close the send half of the connection.
    pub async fn close(&self) -> Result<()> {
        let mut writer = self.inner.lock().await;
        writer.close().await.map_err(MuxError::from)
    }
}

impl fmt::Debug for MuxWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MuxWriter")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Owns one exec/attach connection and routes its frames to channel buffers.
///
/// Bind streams with [`stream`](Self::stream), then [`start`](Self::start)
/// the receive loop. Dropping the demultiplexer cancels the loop.
pub struct Demultiplexer {
    source: Option<BoxedSource>,
    writer: MuxWriter,
    codec: ChannelCodec,
    config: DemuxConfig,
    buffers: HashMap<u8, ChannelBuffer>,
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<()>>>,
}

impl Demultiplexer {
    /// Create a demultiplexer with default configuration.
    pub fn new<R, W>(source: R, sink: W, framing: Framing) -> Self
    where
        R: MessageSource + 'static,
        W: MessageSink + 'static,
    {
        Self::with_config(
            source,
            sink,
            framing,
            DemuxConfig::default(),
            CancellationToken::new(),
        )
    }

    /// Create a demultiplexer governed by `cancel`.
    pub fn with_config<R, W>(
        source: R,
        sink: W,
        framing: Framing,
        config: DemuxConfig,
        cancel: CancellationToken,
    ) -> Self
    where
        R: MessageSource + 'static,
        W: MessageSink + 'static,
    {
        let codec = ChannelCodec::with_config(framing, config.frame.clone());
        let sink: BoxedSink = Box::new(sink);
        let writer = MuxWriter {
            inner: Arc::new(AsyncMutex::new(FrameWriter::with_codec(sink, codec.clone()))),
            cancel: cancel.clone(),
        };
        Self {
            source: Some(Box::new(source)),
            writer,
            codec,
            config,
            buffers: HashMap::new(),
            cancel,
            task: None,
        }
    }

    /// Bind a stream reading `input` and/or writing `output`.
    ///
    /// Input channels are fixed once the receive loop starts and each can
    /// feed only one stream.
    pub fn stream(&mut self, input: Option<u8>, output: Option<u8>) -> Result<ChannelStream> {
        let buffer = match input {
            Some(channel) => {
                if self.source.is_none() {
                    return Err(MuxError::AlreadyStarted);
                }
                if self.buffers.contains_key(&channel) {
                    return Err(MuxError::ChannelInUse(channel));
                }
                let buffer = ChannelBuffer::new(channel);
                self.buffers.insert(channel, buffer.clone());
                Some(buffer)
            }
            None => None,
        };
        ChannelStream::new(buffer, output, self.writer.clone())
    }

    /// Spawn the receive loop.
    pub fn start(&mut self) -> Result<()> {
        let source = self.source.take().ok_or(MuxError::AlreadyStarted)?;
        let reader = FrameReader::with_codec(source, self.codec.clone());
        let buffers = self.buffers.clone();
        let cancel = self.cancel.clone();
        let port_forward = self.config.port_forward;

        debug!(
            framing = ?self.codec.framing(),
            channels = ?buffers.keys().collect::<Vec<_>>(),
            port_forward,
            "starting demultiplexer"
        );
        self.task = Some(tokio::spawn(receive_loop(
            reader,
            buffers,
            cancel,
            port_forward,
        )));
        Ok(())
    }

    /// Handle to the serialized send path.
    pub fn writer(&self) -> MuxWriter {
        self.writer.clone()
    }

    /// Send `payload` as one frame on `channel`.
    pub async fn write(&self, channel: u8, payload: &[u8]) -> Result<()> {
        self.writer.write(channel, payload).await
    }

    /// Token governing this connection.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the receive loop and every pending write.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Wait for the receive loop to end and return how it ended.
    pub async fn wait(&mut self) -> Result<()> {
        let task = self.task.take().ok_or(MuxError::NotStarted)?;
        match task.await {
            Ok(result) => result,
            Err(err) => Err(MuxError::Join(err.to_string())),
        }
    }

    /// Stop the receive loop and close the connection.
    pub async fn shutdown(mut self) -> Result<()> {
        self.cancel.cancel();
        let outcome = if self.task.is_some() {
            self.wait().await
        } else {
            Ok(())
        };
        self.writer.close().await?;
        match outcome {
            Ok(()) | Err(MuxError::Cancelled) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

impl Drop for Demultiplexer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl fmt::Debug for Demultiplexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Demultiplexer")
            .field("framing", &self.codec.framing())
            .field("channels", &self.buffers.keys().collect::<Vec<_>>())
            .field("running", &self.is_running())
            .finish()
    }
}

async fn receive_loop(
    mut reader: FrameReader<BoxedSource>,
    buffers: HashMap<u8, ChannelBuffer>,
    cancel: CancellationToken,
    port_forward: bool,
) -> Result<()> {
    let mut awaiting_port: HashSet<u8> = if port_forward {
        buffers.keys().copied().collect()
    } else {
        HashSet::new()
    };

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("demultiplexer cancelled");
                end_all(&buffers, EndReason::Cancelled);
                return Err(MuxError::Cancelled);
            }
            next = reader.read_frame() => next,
        };

        let frame = match next {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("connection closed");
                end_all(&buffers, EndReason::Closed);
                return Ok(());
            }
            Err(err) => {
                warn!(error = %err, "receive loop failed");
                end_all(&buffers, EndReason::Failed(err.to_string()));
                return Err(err.into());
            }
        };

        let Some(buffer) = buffers.get(&frame.channel) else {
            trace!(
                channel = frame.channel,
                size = frame.payload.len(),
                "dropping frame for unbound channel"
            );
            continue;
        };

        let mut payload = frame.payload;
        if awaiting_port.remove(&frame.channel) {
            if payload.len() < PORT_PREFIX_LEN {
                let err = MuxError::MissingPortPrefix(frame.channel);
                warn!(error = %err, "receive loop failed");
                end_all(&buffers, EndReason::Failed(err.to_string()));
                return Err(err);
            }
            let port = payload.get_u16_le();
            debug!(channel = frame.channel, port, "port-forward channel opened");
        }
        buffer.append(&payload);
    }
}

fn end_all(buffers: &HashMap<u8, ChannelBuffer>, reason: EndReason) {
    for buffer in buffers.values() {
        buffer.end_with(reason.clone());
    }
}
