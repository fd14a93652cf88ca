//! Blocking TCP transport: connect/listen/accept with timeouts.
//!
//! One `TcpStream` is shared by both directions of a session; framing and
//! timeouts above the byte stream are the frame codec's job
//! ([`binkp_msg::DeadlinedIo`]), not this crate's.
#![forbid(unsafe_code)]

mod error;

pub use error::TransportError;

use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use binkp_types::Deadline;

/// The well-known Binkp TCP port (FTS-1026).
pub const DEFAULT_PORT: u16 = 24554;

/// Opens an outbound connection, bounding the whole resolve+connect
/// sequence by `deadline`.
pub fn connect(host: &str, port: u16, deadline: Deadline) -> Result<TcpStream, TransportError> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|_| TransportError::Resolve {
            host: host.to_string(),
            port,
        })?
        .collect();

    let mut last_err = None;
    for addr in addrs {
        let remaining = deadline.remaining();
        if remaining.is_zero() {
            return Err(TransportError::ConnectTimeout {
                host: host.to_string(),
                port,
            });
        }
        match TcpStream::connect_timeout(&addr, remaining) {
            Ok(stream) => {
                log::info!("connected to {host}:{port} ({addr})");
                stream.set_nodelay(true).ok();
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }

    match last_err {
        Some(e) => Err(TransportError::Io(e)),
        None => Err(TransportError::Resolve {
            host: host.to_string(),
            port,
        }),
    }
}

/// Binds a listening socket on `bind_addr:port`.
pub fn listen(bind_addr: &str, port: u16) -> Result<TcpListener, TransportError> {
    let listener =
        TcpListener::bind((bind_addr, port)).map_err(|source| TransportError::Bind {
            addr: bind_addr.to_string(),
            port,
            source,
        })?;
    log::info!("listening on {bind_addr}:{port}");
    Ok(listener)
}

/// Blocks for the next inbound connection. Binkp has no standing
/// per-accept deadline in FTS-1026; the *session* timeout begins once a
/// connection is accepted, which is the embedding `binkp` crate's concern.
pub fn accept(listener: &TcpListener) -> Result<(TcpStream, SocketAddr), TransportError> {
    let (stream, peer) = listener.accept()?;
    log::info!("accepted connection from {peer}");
    stream.set_nodelay(true).ok();
    Ok((stream, peer))
}

/// Process-wide transport initialisation hook. TCP on the platforms this
/// engine targets needs none; the hook exists so embedders that swap in a
/// transport requiring global setup (as some historical NetBIOS stacks do)
/// have a place to call it, per the supervisor/collaborator boundary.
pub fn init() {}

/// Counterpart to [`init`].
pub fn teardown() {}

/// Applies a socket-level timeout derived from `deadline` to both halves
/// of `stream`. Used once at session setup; per-frame reads/writes
/// refresh the timeout themselves via [`binkp_msg::DeadlinedIo`].
pub fn apply_deadline(stream: &TcpStream, deadline: Deadline) -> std::io::Result<()> {
    let remaining = deadline.remaining();
    let timeout = if remaining.is_zero() {
        Duration::from_millis(1)
    } else {
        remaining
    };
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;
    Ok(())
}
