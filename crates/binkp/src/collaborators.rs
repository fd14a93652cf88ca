//! Collaborator traits at the boundary between the engine and its
//! embedder. The core calls these; it never scans a BSO outbound
//! directory or writes to an inbox itself.

use std::path::Path;

use binkp_types::Address;

/// One file offered for this session's outbound queue.
#[derive(Debug, Clone)]
pub struct OutboundFile {
    pub name: String,
    pub local_path: std::path::PathBuf,
    pub size: u64,
    pub timestamp: u64,
}

/// Supplies the files to offer in one session. The core calls this once,
/// at the start of the transfer state.
pub trait OutboundScan {
    fn scan(&self, network: &str) -> std::io::Result<Vec<OutboundFile>>;
}

/// What to do with an incoming `M_FILE` offer, decided before any bytes
/// are transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptDecision {
    /// Accept from the beginning.
    Accept,
    /// Accept, but resume from a byte offset we already hold. The partial
    /// bytes must already sit at the engine's deterministic staging path
    /// for this file name (see `session::transfer::temp_path`); the engine
    /// opens that path and seeks to `offset` rather than being handed one.
    Resume(u64),
    /// Reject; the offer is a duplicate or otherwise unwanted.
    Skip,
}

/// Receives completed inbound files. The core stages every inbound file
/// under a temporary path and only calls `commit` once `size` bytes have
/// arrived and (if `use_crc` is negotiated) the CRC-32 has verified.
pub trait InboundSink {
    /// Decides whether to accept, skip, or resume an incoming file offer.
    fn accept(&mut self, name: &str, size: u64, timestamp: u64) -> AcceptDecision;

    /// Moves a fully-received file from its staging path into the inbox.
    fn commit(
        &mut self,
        name: &str,
        temp_path: &Path,
        size: u64,
        timestamp: u64,
        remote_addresses: &[Address],
    ) -> std::io::Result<()>;
}
