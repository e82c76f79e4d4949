//! Client-side streaming primitives for exec/attach connections and watch responses.
//!
//! kstream splits a multiplexed exec connection into per-channel streams and
//! decodes newline-delimited watch responses into typed events.
//!
//! # Crate Structure
//!
//! - [`transport`]: message-oriented connection abstraction and an in-memory pair
//! - [`frame`]: channel-prefixed framing for `channel.k8s.io` and `base64.channel.k8s.io`
//! - [`mux`]: receive loop, per-channel buffers and streams, exec sessions
//! - [`watch`]: line reader, watch envelopes, watcher task and event stream

/// Re-export transport types.
pub mod transport {
    pub use kstream_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use kstream_frame::*;
}

/// Re-export demultiplexer types.
pub mod mux {
    pub use kstream_mux::*;
}

/// Re-export watch types.
pub mod watch {
    pub use kstream_watch::*;
}
