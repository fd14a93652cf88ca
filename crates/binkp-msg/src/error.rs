//! Frame- and command-level error types.

use thiserror::Error;

/// Errors raised while encoding or decoding a single frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame payload of {0} bytes exceeds the 32767-byte limit")]
    FrameTooLarge(usize),

    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("connection closed while reading {0}")]
    ConnectionClosed(&'static str),

    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },

    #[error("unknown command identifier {0}")]
    InvalidCommand(u8),

    #[error("command argument is not valid UTF-8")]
    InvalidArgument,

    #[error("malformed argument {argument:?} for command {command}: {reason}")]
    MalformedCommand {
        command: &'static str,
        argument: String,
        reason: &'static str,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
