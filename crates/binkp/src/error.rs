//! The engine-wide error type.

use thiserror::Error;

/// All error kinds the core can surface.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Frame(#[from] binkp_msg::FrameError),

    #[error(transparent)]
    Transport(#[from] binkp_transport::TransportError),

    #[error("authentication failed: {0}")]
    AuthFailed(#[source] binkp_auth::AuthError),

    #[error(transparent)]
    Compression(#[from] binkp_plz::PlzError),

    #[error("PLZ negotiation failed: {0}")]
    PlzNegotiation(#[from] binkp_plz::PlzRequiredButUnmet),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("answerer is busy: {0}")]
    Busy(String),

    #[error("session timed out")]
    Timeout,

    #[error("local I/O error: {0}")]
    LocalIo(#[source] std::io::Error),

    #[error("session was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<binkp_auth::AuthError> for Error {
    fn from(e: binkp_auth::AuthError) -> Self {
        Error::AuthFailed(e)
    }
}
