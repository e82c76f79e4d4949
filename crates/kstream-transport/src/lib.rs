//! Duplex message transport abstraction.
//!
//! The exec/attach protocol rides on a message-oriented, full-duplex connection
//! (normally a WebSocket) that is established elsewhere. This crate defines the
//! seam the rest of kstream talks to:
//! - [`MessageSource`] for the receive half
//! - [`MessageSink`] for the send half
//!
//! An in-process [`memory`] transport is provided for tests and offline replay.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::{
    memory_pair, MemorySink, MemorySource, MemoryTransport, DEFAULT_MEMORY_CAPACITY,
};
pub use traits::{BoxedSink, BoxedSource, Message, MessageSink, MessageSource};
