//! A directory-backed demo of the [`binkp::OutboundScan`]/[`binkp::InboundSink`]
//! collaborators: outbound files are whatever sits in one directory,
//! inbound files land unconditionally in another. A real tosser would
//! scan a BSO outbound queue and dedup against its own inbox instead;
//! that's out of scope here, so this keeps things
//! simple enough to exercise end to end from the command line.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use binkp::{AcceptDecision, Address, InboundSink, OutboundFile, OutboundScan};

pub struct DirOutboundScan {
    pub dir: PathBuf,
}

impl OutboundScan for DirOutboundScan {
    fn scan(&self, _network: &str) -> std::io::Result<Vec<OutboundFile>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let timestamp = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or(0);
            files.push(OutboundFile {
                name,
                local_path: entry.path(),
                size: metadata.len(),
                timestamp,
            });
        }
        Ok(files)
    }
}

pub struct DirInboundSink {
    pub dir: PathBuf,
}

impl InboundSink for DirInboundSink {
    fn accept(&mut self, name: &str, size: u64, _timestamp: u64) -> AcceptDecision {
        log::info!("offered {name} ({size} bytes)");
        AcceptDecision::Accept
    }

    fn commit(
        &mut self,
        name: &str,
        temp_path: &Path,
        size: u64,
        _timestamp: u64,
        remote_addresses: &[Address],
    ) -> std::io::Result<()> {
        let dest = self.dir.join(basename(name));
        fs::rename(temp_path, &dest)?;
        log::info!(
            "received {name} ({size} bytes) from {:?} -> {}",
            remote_addresses,
            dest.display()
        );
        Ok(())
    }
}

/// Strips any directory components a hostile peer might put in a file
/// name before it's used to build a local path.
fn basename(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string())
}
