//! Conventional channel indices for exec and attach.
//!
//! The indices are a convention between client and server; the framing layer
//! itself accepts any value in `0..=255` (port-forward uses arbitrary pairs).

/// Process standard input (client to server).
pub const STDIN: u8 = 0;

/// Process standard output.
pub const STDOUT: u8 = 1;

/// Process standard error.
pub const STDERR: u8 = 2;

/// Execution status reported by the server once the process ends.
pub const ERROR: u8 = 3;

/// Terminal resize events (client to server).
pub const RESIZE: u8 = 4;

/// Returns a human-readable name for a channel index.
pub fn channel_name(id: u8) -> &'static str {
    match id {
        STDIN => "STDIN",
        STDOUT => "STDOUT",
        STDERR => "STDERR",
        ERROR => "ERROR",
        RESIZE => "RESIZE",
        _ => "USER",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_for_exec_channels() {
        assert_eq!(channel_name(STDIN), "STDIN");
        assert_eq!(channel_name(ERROR), "ERROR");
        assert_eq!(channel_name(RESIZE), "RESIZE");
        assert_eq!(channel_name(200), "USER");
    }
}
