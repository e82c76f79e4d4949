use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use kstream_frame::SubProtocol;
use tokio_util::sync::CancellationToken;

use crate::exit::{io_error, CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod replay;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the events of a newline-delimited watch response.
    Watch(WatchArgs),
    /// Encode one payload as a channel frame.
    Encode(EncodeArgs),
    /// Decode one channel frame.
    Decode(DecodeArgs),
    /// Replay recorded server frames through an exec session.
    Replay(ReplayArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Watch(args) => watch::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Replay(args) => replay::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Watch response body to read. Reads stdin when omitted.
    pub file: Option<PathBuf>,
    /// Stop after N events.
    #[arg(long)]
    pub count: Option<usize>,
    /// Longest accepted line in bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_line_length: Option<usize>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Sub-protocol selecting the framing.
    #[arg(long, short = 'p', default_value = SubProtocol::BASE64_CHANNEL)]
    pub protocol: SubProtocol,
    /// Channel index.
    #[arg(long, short = 'c', default_value = "0")]
    pub channel: u8,
    /// Payload string.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file. Reads stdin when neither --data nor --file is set.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Sub-protocol selecting the framing.
    #[arg(long, short = 'p', default_value = SubProtocol::BASE64_CHANNEL)]
    pub protocol: SubProtocol,
    /// Encoded frame (text framings only).
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read the encoded frame from file. Reads stdin when neither --data nor --file is set.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// File with one encoded server frame per line. Reads stdin when omitted.
    ///
    /// Binary framings expect each line to be the standard base64 encoding of
    /// the whole binary message.
    pub file: Option<PathBuf>,
    /// Sub-protocol the frames were recorded under.
    #[arg(long, short = 'p', default_value = SubProtocol::BASE64_CHANNEL)]
    pub protocol: SubProtocol,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Read `path`, or all of stdin when no path is given.
pub(crate) fn read_input(path: Option<&Path>) -> CliResult<Vec<u8>> {
    match path {
        Some(path) => std::fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err)),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|err| io_error("failed reading stdin", err))?;
            Ok(buf)
        }
    }
}

pub(crate) fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))
}

/// Cancel `token` on Ctrl-C.
pub(crate) fn install_ctrlc_handler(token: CancellationToken) -> CliResult<()> {
    ctrlc::set_handler(move || token.cancel())
        .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
