use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// This node's own FTN address(es), sent in M_ADR. May be repeated.
    #[arg(short, long = "address", required = true)]
    pub addresses: Vec<binkp::Address>,

    /// Shared secret for the remote node. Omit for an unauthenticated session.
    #[arg(short, long)]
    pub password: Option<String>,

    /// Refuse a bare plaintext password; only accept CRAM-MD5.
    #[arg(long)]
    pub require_cram: bool,

    /// Advertise and verify per-file CRC-32.
    #[arg(long)]
    pub crc: bool,

    /// PLZ (zlib) compression mode to advertise.
    #[arg(long, value_enum, default_value_t = PlzModeArg::Supported)]
    pub plz: PlzModeArg,

    /// Directory to offer outbound files from.
    #[arg(long, default_value = ".")]
    pub outbound_dir: PathBuf,

    /// Directory to land accepted inbound files in.
    #[arg(long, default_value = ".")]
    pub inbound_dir: PathBuf,

    /// Per-frame read/write timeout, in seconds.
    #[arg(long, default_value_t = 10)]
    pub frame_timeout: u64,

    /// Whole-session timeout, in seconds.
    #[arg(long, default_value_t = 600)]
    pub session_timeout: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dials a remote node and runs the originator side of one session.
    Dial {
        /// Remote host to connect to.
        host: String,
        /// Remote port; defaults to the well-known Binkp port (24554).
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Listens for inbound connections, serving the answerer side of each
    /// one in turn.
    Listen {
        /// Local address to bind.
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
        /// Local port; defaults to the well-known Binkp port (24554).
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// Mirrors [`binkp::PlzMode`] as a `clap`-friendly enum.
#[derive(ValueEnum, Copy, Clone, Debug, Default)]
pub enum PlzModeArg {
    None,
    #[default]
    Supported,
    Required,
}

impl std::fmt::Display for PlzModeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlzModeArg::None => write!(f, "none"),
            PlzModeArg::Supported => write!(f, "supported"),
            PlzModeArg::Required => write!(f, "required"),
        }
    }
}

impl From<PlzModeArg> for binkp::PlzMode {
    fn from(mode: PlzModeArg) -> Self {
        match mode {
            PlzModeArg::None => binkp::PlzMode::None,
            PlzModeArg::Supported => binkp::PlzMode::Supported,
            PlzModeArg::Required => binkp::PlzMode::Required,
        }
    }
}

impl Cli {
    pub fn make_config(&self, remote_host: String, remote_port: u16) -> binkp::Config {
        binkp::Config {
            remote_host,
            remote_port,
            password: self.password.clone(),
            use_cram: self.require_cram || self.password.is_some(),
            use_crc: self.crc,
            plz_mode: self.plz.into(),
            local_addresses: self.addresses.clone(),
            staging_dir: self.inbound_dir.clone(),
            frame_timeout: std::time::Duration::from_secs(self.frame_timeout),
            session_timeout: std::time::Duration::from_secs(self.session_timeout),
            ..Default::default()
        }
    }
}
