//! Transport-level errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not resolve {host}:{port}")]
    Resolve { host: String, port: u16 },

    #[error("connect to {host}:{port} timed out")]
    ConnectTimeout { host: String, port: u16 },

    #[error("failed to bind {addr}:{port}")]
    Bind {
        addr: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
