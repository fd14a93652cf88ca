//! A blocking, single-threaded Binkp (FTS-1026/FTS-1027/FTS-1028, FRL-1036)
//! mail-exchange engine.
//!
//! The core never touches an outbound queue directory or an inbox
//! directly; it calls [`OutboundScan`] and [`InboundSink`], collaborators
//! the embedder supplies. See [`Config`] for the per-network settings the
//! handshake and transfer state machines negotiate from.
#![forbid(unsafe_code)]

mod cancel;
pub mod collaborators;
pub mod config;
mod error;
mod session;
mod wire;

pub use binkp_plz::{PlzLevel, PlzMode};
pub use binkp_types::Address;
pub use cancel::CancelToken;
pub use collaborators::{AcceptDecision, InboundSink, OutboundFile, OutboundScan};
pub use config::Config;
pub use error::{Error, Result};
pub use session::state::{NegotiatedOptions, Outcome, SessionId, Stats};
pub use session::{dial, serve};
