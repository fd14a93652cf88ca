//! The `Session` data model: negotiated options, authenticated
//! remote addresses, and running statistics.

use binkp_msg::SessionSecurity;
use binkp_plz::Negotiated as PlzNegotiated;
use binkp_types::Address;

/// Options agreed during the handshake. Once set, these hold
/// for the whole session.
#[derive(Debug, Clone, Copy)]
pub struct NegotiatedOptions {
    pub use_crc: bool,
    pub use_nr: bool,
    pub use_nd: bool,
    pub plz: PlzNegotiated,
    pub secure: bool,
}

impl NegotiatedOptions {
    pub fn plz_on(&self) -> bool {
        matches!(self.plz, PlzNegotiated::On)
    }
}

/// Running byte/file counters surfaced to the caller on session
/// completion.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub files_sent: u32,
    pub files_received: u32,
    pub files_skipped_local: u32,
    pub files_skipped_remote: u32,
}

/// The outcome of a completed handshake, before the transfer state runs.
#[derive(Debug, Clone)]
pub struct HandshakeResult {
    pub options: NegotiatedOptions,
    pub remote_addresses: Vec<Address>,
    pub security: SessionSecurity,
}

/// A monotonically increasing id for tagging log lines from concurrent
/// sessions in one process, since log lines from concurrent sessions interleave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sess-{}", self.0)
    }
}

static NEXT_SESSION_ID: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);

impl SessionId {
    pub fn next() -> Self {
        SessionId(NEXT_SESSION_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed))
    }
}

/// The outcome of a whole session.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The session completed cleanly; both sides exchanged `M_EOB` and
    /// all files were resolved.
    Done(Stats),
    /// The answerer refused the connection (originator role only).
    Busy,
}
