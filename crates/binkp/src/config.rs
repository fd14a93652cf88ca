//! The configuration collaborator: a plain, read-only record.
//! Loading it from an INI file or any other format is the embedder's job.

use std::path::PathBuf;
use std::time::Duration;

use binkp_plz::{PlzLevel, PlzMode};
use binkp_types::Address;

/// Per-network configuration supplied by the embedder.
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote host to dial (originator role only).
    pub remote_host: String,
    /// Remote port to dial (originator role only).
    pub remote_port: u16,
    /// Shared secret for this network/node.
    pub password: Option<String>,
    /// Whether to offer/require CRAM-MD5 rather than plaintext (answerer
    /// role: whether to issue a challenge; originator role: whether a
    /// bare password is acceptable if the peer doesn't challenge).
    pub use_cram: bool,
    /// Whether to advertise and honor per-file CRC-32 verification.
    pub use_crc: bool,
    /// Whether to advertise the Non-Reliable (`NR`) option.
    pub use_nr: bool,
    /// Local PLZ compression mode.
    pub plz_mode: PlzMode,
    /// Local PLZ compression level.
    pub plz_level: PlzLevel,
    /// This node's own addresses, sent in `M_ADR`.
    pub local_addresses: Vec<Address>,
    /// Per-frame read/write timeout (default: 10s).
    pub frame_timeout: Duration,
    /// Whole-session timeout (default: 10min).
    pub session_timeout: Duration,
    /// System name advertised in `M_NUL SYS <name>`.
    pub system_name: String,
    /// Sysop name advertised in `M_NUL ZYZ <sysop>`.
    pub sysop_name: String,
    /// Location advertised in `M_NUL LOC <location>`.
    pub location: String,
    /// Program/protocol version advertised in `M_NUL VER <program>/<protocol>`.
    pub version_string: String,
    /// Directory inbound files are staged in before their atomic rename to
    /// the destination the inbound sink collaborator chooses.
    pub staging_dir: PathBuf,
}

impl Config {
    pub fn frame_deadline(&self) -> binkp_types::Deadline {
        binkp_types::Deadline::after(self.frame_timeout)
    }

    pub fn session_deadline(&self) -> binkp_types::Deadline {
        binkp_types::Deadline::after(self.session_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote_host: String::new(),
            remote_port: binkp_transport::DEFAULT_PORT,
            password: None,
            use_cram: true,
            use_crc: false,
            use_nr: false,
            plz_mode: PlzMode::Supported,
            plz_level: PlzLevel::Normal,
            local_addresses: Vec::new(),
            frame_timeout: Duration::from_secs(10),
            session_timeout: Duration::from_secs(600),
            system_name: String::new(),
            sysop_name: String::new(),
            location: String::new(),
            version_string: format!("binkp-rs/{}", env!("CARGO_PKG_VERSION")),
            staging_dir: std::env::temp_dir(),
        }
    }
}
