use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use kstream_frame::Framing;
use kstream_mux::exec;
use kstream_transport::{memory_pair, MemorySource, Message, DEFAULT_MEMORY_CAPACITY};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cmd::{install_ctrlc_handler, read_input, runtime, ReplayArgs};
use crate::exit::{mux_error, CliError, CliResult, DATA_INVALID};
use crate::output::{print_exec, ExecOutput, OutputFormat};

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    let input = read_input(args.file.as_deref())?;
    let framing = args.protocol.framing();
    let messages = parse_recording(&input, framing)?;
    info!(protocol = %args.protocol, frames = messages.len(), "replaying exec session");

    let cancel = CancellationToken::new();
    install_ctrlc_handler(cancel.clone())?;

    let out = runtime()?.block_on(replay(messages, framing, cancel))?;
    print_exec(&out, format);
    Ok(out.exit_code)
}

async fn replay(
    messages: Vec<Message>,
    framing: Framing,
    cancel: CancellationToken,
) -> CliResult<ExecOutput> {
    let source = MemorySource::from_messages(messages);
    // The peer's receive half stays open so client writes are accepted.
    let (local, remote) = memory_pair(DEFAULT_MEMORY_CAPACITY);
    let (_, sink) = local.into_split();
    let (_remote_rx, _remote_tx) = remote.into_split();

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit_code = exec(source, sink, framing, cancel, |streams| {
        let (stdout, stderr) = (&mut stdout, &mut stderr);
        async move {
            let (out, err) = tokio::try_join!(
                streams.stdout.read_to_end(),
                streams.stderr.read_to_end()
            )?;
            *stdout = out;
            *stderr = err;
            Ok(())
        }
    })
    .await
    .map_err(|err| mux_error("replay failed", err))?;
    debug!(exit_code, stdout = stdout.len(), stderr = stderr.len(), "replay finished");

    Ok(ExecOutput {
        exit_code,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

/// One message per non-blank line. Binary framings carry each message as
/// standard base64 so the recording stays line-oriented.
fn parse_recording(input: &[u8], framing: Framing) -> CliResult<Vec<Message>> {
    let text = std::str::from_utf8(input)
        .map_err(|_| CliError::new(DATA_INVALID, "recording is not valid UTF-8"))?;

    text.lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(lineno, line)| match framing {
            Framing::Base64 => Ok(Message::Text(line.to_string())),
            Framing::Binary => STANDARD
                .decode(line.trim())
                .map(|raw| Message::Binary(Bytes::from(raw)))
                .map_err(|err| CliError::new(DATA_INVALID, format!("line {lineno}: {err}"))),
        })
        .collect()
}
