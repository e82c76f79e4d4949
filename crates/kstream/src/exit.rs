use std::fmt;
use std::io;

use kstream_frame::FrameError;
use kstream_mux::MuxError;
use kstream_transport::TransportError;
use kstream_watch::WatchError;

// Exit code constants aligned with sysexits-style semantics.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const CANCELLED: i32 = 130;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => USAGE,
        io::ErrorKind::InvalidData => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::UnsupportedProtocol(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn mux_error(context: &str, err: MuxError) -> CliError {
    match err {
        MuxError::Frame(err) => frame_error(context, err),
        MuxError::Transport(err) => transport_error(context, err),
        MuxError::ConnectionLost(_) => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        MuxError::Cancelled => CliError::new(CANCELLED, format!("{context}: {err}")),
        MuxError::Json(_) | MuxError::MissingPortPrefix(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        MuxError::ExecFailed(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        MuxError::Unsupported(_) | MuxError::ChannelInUse(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn watch_error(context: &str, err: WatchError) -> CliError {
    match err {
        WatchError::Io(source) => io_error(context, source),
        WatchError::Cancelled => CliError::new(CANCELLED, format!("{context}: {err}")),
        WatchError::Status(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}
