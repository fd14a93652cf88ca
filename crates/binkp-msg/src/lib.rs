//! Binkp frame codec and command set (FTS-1026 §2, §3).
#![forbid(unsafe_code)]

mod command;
mod error;
mod frame;
pub mod options;

pub use command::{id, Command, SessionSecurity};
pub use error::FrameError;
pub use frame::{decode_from, encode, write_to, DeadlinedIo, Frame, MAX_PAYLOAD};
