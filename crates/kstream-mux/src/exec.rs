use std::future::Future;

use kstream_frame::{Framing, ERROR, STDERR, STDIN, STDOUT};
use kstream_transport::{MessageSink, MessageSource};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::control::ExecStatus;
use crate::demux::{DemuxConfig, Demultiplexer, MuxWriter};
use crate::error::Result;
use crate::stream::ChannelStream;

/// Streams handed to an exec handler.
#[derive(Debug)]
pub struct ExecStreams {
    /// Write-only, channel 0.
    pub stdin: ChannelStream,
    /// Read-only, channel 1.
    pub stdout: ChannelStream,
    /// Read-only, channel 2.
    pub stderr: ChannelStream,
    /// Send path for out-of-band events such as terminal resize.
    pub control: MuxWriter,
}

/// Run a remote command over an established exec connection.
///
/// `handler` receives the process streams and returns once the interaction is
/// complete. The status the server then writes on the ERROR channel becomes
/// the returned exit code; a connection that closes without a status counts
/// as success.
pub async fn exec<R, W, F, Fut>(
    source: R,
    sink: W,
    framing: Framing,
    cancel: CancellationToken,
    handler: F,
) -> Result<i32>
where
    R: MessageSource + 'static,
    W: MessageSink + 'static,
    F: FnOnce(ExecStreams) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut demux =
        Demultiplexer::with_config(source, sink, framing, DemuxConfig::default(), cancel);
    let streams = ExecStreams {
        stdin: demux.stream(None, Some(STDIN))?,
        stdout: demux.stream(Some(STDOUT), None)?,
        stderr: demux.stream(Some(STDERR), None)?,
        control: demux.writer(),
    };
    let status = demux.stream(Some(ERROR), None)?;
    demux.start()?;

    handler(streams).await?;

    let raw = status.read_to_end().await?;
    demux.shutdown().await?;

    if raw.iter().all(u8::is_ascii_whitespace) {
        debug!("exec finished without status");
        return Ok(0);
    }
    let code = ExecStatus::from_slice(&raw)?.exit_code()?;
    debug!(code, "exec finished");
    Ok(code)
}
