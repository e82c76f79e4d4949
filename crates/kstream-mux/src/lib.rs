//! Channel demultiplexing for exec/attach connections.
//!
//! One [`Demultiplexer`] owns a duplex connection. Its receive loop routes
//! every inbound frame to the [`ChannelBuffer`] of its channel; callers read
//! and write through [`ChannelStream`]s, and all writes share one serialized
//! send path ([`MuxWriter`]).
//!
//! [`exec`] wires the conventional stdin/stdout/stderr/error channels for a
//! remote command and turns the final status into an exit code.

pub mod buffer;
pub mod control;
pub mod demux;
pub mod error;
pub mod exec;
pub mod stream;

pub use buffer::ChannelBuffer;
pub use control::{ExecStatus, StatusCause, StatusDetails, TerminalSize};
pub use demux::{DemuxConfig, Demultiplexer, MuxWriter};
pub use error::{MuxError, Result};
pub use exec::{exec, ExecStreams};
pub use stream::ChannelStream;
