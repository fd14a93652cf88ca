//! The file-transfer sub-protocol: the send loop, the receive
//! loop, and the `M_GET`/`M_SKIP`/CRC bookkeeping that ties them together.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};

use binkp_msg::{Command, Frame};
use binkp_types::{Address, Deadline, FileMeta};

use crate::cancel::CancelToken;
use crate::collaborators::{AcceptDecision, InboundSink, OutboundFile, OutboundScan};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::state::{NegotiatedOptions, SessionId, Stats};
use crate::wire::{recv_frame, send_command, send_data};

/// A file we are currently streaming to the peer.
struct SendTransfer {
    name: String,
    local_path: PathBuf,
    size: u64,
    timestamp: u64,
    offset: u64,
    file: File,
}

/// A file the peer is currently streaming to us.
struct RecvTransfer {
    name: String,
    size: u64,
    timestamp: u64,
    offset: u64,
    temp_path: PathBuf,
    file: File,
    /// Set once `offset == size` and `use_crc` is negotiated: the transfer
    /// stays open, unresolved, until the sender's `M_NUL CRC` frame arrives.
    awaiting_crc: bool,
}

/// Runs the transfer state for one session to completion:
/// offers every file the embedder's [`OutboundScan`] returns, accepts
/// whatever the peer offers via [`InboundSink`], and exchanges `M_EOB` once
/// both queues are drained.
#[allow(clippy::too_many_arguments)]
pub fn run(
    stream: &mut TcpStream,
    config: &Config,
    options: NegotiatedOptions,
    sid: SessionId,
    remote_addresses: &[Address],
    scan: &dyn OutboundScan,
    sink: &mut dyn InboundSink,
    session_deadline: Deadline,
    cancel: &CancelToken,
) -> Result<Stats> {
    let network = remote_addresses
        .first()
        .map(|a| a.to_string())
        .unwrap_or_default();
    let files = scan.scan(&network).map_err(Error::LocalIo)?;

    let mut engine = Engine {
        options,
        stats: Stats::default(),
        outbound_queue: files.into_iter().collect(),
        outbound_active: None,
        inbound_active: None,
        local_eob_sent: false,
        remote_eob_received: false,
    };

    loop {
        if session_deadline.is_expired() {
            return Err(Error::Timeout);
        }
        if cancel.is_cancelled() {
            if let Some(inbound) = engine.inbound_active.take() {
                let _ = fs::remove_file(&inbound.temp_path);
            }
            return Err(Error::Cancelled);
        }

        engine.emit_pending(stream, config, sid)?;
        if engine.is_done() {
            break;
        }

        let remaining = session_deadline.remaining();
        let frame_deadline = if remaining < config.frame_timeout {
            Deadline::after(remaining)
        } else {
            config.frame_deadline()
        };

        match recv_frame(stream, frame_deadline) {
            Ok(Frame::Command(payload)) => {
                let cmd = Command::from_payload(&payload)?;
                log::debug!("{sid}: <- {cmd:?}");
                engine.handle_command(cmd, stream, config, sid, remote_addresses, sink)?;
            }
            Ok(Frame::Data(payload)) => {
                engine.handle_data(&payload, stream, config, sid, remote_addresses, sink)?;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(engine.stats)
}

struct Engine {
    options: NegotiatedOptions,
    stats: Stats,
    outbound_queue: VecDeque<OutboundFile>,
    outbound_active: Option<SendTransfer>,
    inbound_active: Option<RecvTransfer>,
    local_eob_sent: bool,
    remote_eob_received: bool,
}

impl Engine {
    fn is_done(&self) -> bool {
        self.local_eob_sent
            && self.remote_eob_received
            && self.outbound_active.is_none()
            && self.inbound_active.is_none()
            && self.outbound_queue.is_empty()
    }

    /// Emits at most one frame's worth of outbound progress: a data chunk
    /// of the file currently streaming, or the next file's offer, or (once
    /// the queue is empty) our own `M_EOB`.
    fn emit_pending(&mut self, stream: &mut TcpStream, config: &Config, sid: SessionId) -> Result<()> {
        if let Some(active) = &mut self.outbound_active {
            let mut buf = vec![0u8; binkp_msg::MAX_PAYLOAD];
            let n = active.file.read(&mut buf).map_err(Error::LocalIo)?;
            if n == 0 {
                self.finish_send(stream, config, sid)?;
                return Ok(());
            }
            buf.truncate(n);
            let payload = if self.options.plz_on() {
                binkp_plz::compress_if_smaller(&buf, config.plz_level)?
            } else {
                buf
            };
            send_data(stream, &payload, config.frame_deadline(), sid)?;
            active.offset += n as u64;
            self.stats.bytes_sent += n as u64;
            return Ok(());
        }

        if let Some(next) = self.outbound_queue.pop_front() {
            self.start_send(stream, config, sid, next)?;
            return Ok(());
        }

        if !self.local_eob_sent {
            send_command(stream, &Command::Eob, config.frame_deadline(), sid)?;
            self.local_eob_sent = true;
        }
        Ok(())
    }

    fn start_send(
        &mut self,
        stream: &mut TcpStream,
        config: &Config,
        sid: SessionId,
        next: OutboundFile,
    ) -> Result<()> {
        let file = File::open(&next.local_path).map_err(Error::LocalIo)?;
        send_command(
            stream,
            &Command::File(FileMeta::new(next.name.clone(), next.size, next.timestamp, 0)),
            config.frame_deadline(),
            sid,
        )?;
        self.outbound_active = Some(SendTransfer {
            name: next.name,
            local_path: next.local_path,
            size: next.size,
            timestamp: next.timestamp,
            offset: 0,
            file,
        });
        if next.size == 0 {
            self.finish_send(stream, config, sid)?;
        }
        Ok(())
    }

    fn finish_send(&mut self, stream: &mut TcpStream, config: &Config, sid: SessionId) -> Result<()> {
        let active = self.outbound_active.take().expect("finish_send without an active transfer");
        if self.options.use_crc {
            let crc = crc32_of_file(&active.local_path).map_err(Error::LocalIo)?;
            send_command(
                stream,
                &Command::Nul(format!("CRC {crc:08x}")),
                config.frame_deadline(),
                sid,
            )?;
        }
        self.stats.files_sent += 1;
        log::info!("{sid}: sent {} ({} bytes)", active.name, active.size);
        Ok(())
    }

    fn handle_command(
        &mut self,
        cmd: Command,
        stream: &mut TcpStream,
        config: &Config,
        sid: SessionId,
        remote_addresses: &[Address],
        sink: &mut dyn InboundSink,
    ) -> Result<()> {
        match cmd {
            Command::Nul(arg) => {
                if let Some(hex) = arg.strip_prefix("CRC ") {
                    self.handle_crc(hex.trim(), stream, config, sid, remote_addresses, sink)?;
                }
                Ok(())
            }
            Command::File(meta) => self.handle_offer(meta, stream, config, sid, sink),
            Command::Eob => {
                self.remote_eob_received = true;
                Ok(())
            }
            Command::Got(_) => Ok(()),
            Command::Skip(ack) => {
                if matches!(&self.outbound_active, Some(a) if a.name == ack.name) {
                    self.outbound_active = None;
                    self.stats.files_skipped_remote += 1;
                    log::info!("{sid}: peer skipped {}", ack.name);
                } else {
                    log::warn!("{sid}: M_SKIP for {} does not match the active transfer", ack.name);
                }
                Ok(())
            }
            Command::Get(meta) => {
                if let Some(active) = &mut self.outbound_active {
                    if active.name == meta.name {
                        active
                            .file
                            .seek(SeekFrom::Start(meta.offset))
                            .map_err(Error::LocalIo)?;
                        active.offset = meta.offset;
                        return Ok(());
                    }
                }
                log::warn!("{sid}: M_GET for {} does not match the active transfer", meta.name);
                Ok(())
            }
            Command::Err(msg) => Err(Error::Protocol(format!("peer reported an error: {msg}"))),
            other => Err(Error::Protocol(format!(
                "unexpected {other:?} during the transfer state"
            ))),
        }
    }

    fn handle_offer(
        &mut self,
        meta: FileMeta,
        stream: &mut TcpStream,
        config: &Config,
        sid: SessionId,
        sink: &mut dyn InboundSink,
    ) -> Result<()> {
        if self.inbound_active.is_some() {
            return Err(Error::Protocol(format!(
                "M_FILE for {} arrived while another inbound transfer is active",
                meta.name
            )));
        }
        if self.remote_eob_received {
            return Err(Error::Protocol(format!(
                "M_FILE for {} arrived after the peer's M_EOB",
                meta.name
            )));
        }

        match sink.accept(&meta.name, meta.size, meta.timestamp) {
            AcceptDecision::Skip => {
                self.stats.files_skipped_local += 1;
                send_command(stream, &Command::Skip(meta.ack()), config.frame_deadline(), sid)?;
                Ok(())
            }
            AcceptDecision::Accept => {
                let temp_path = self.temp_path(config, &meta.name);
                let file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&temp_path)
                    .map_err(Error::LocalIo)?;
                self.open_inbound(meta, 0, temp_path, file, stream, config, sid, sink)
            }
            AcceptDecision::Resume(offset) => {
                let temp_path = self.temp_path(config, &meta.name);
                let mut file = OpenOptions::new()
                    .write(true)
                    .open(&temp_path)
                    .map_err(Error::LocalIo)?;
                file.seek(SeekFrom::Start(offset)).map_err(Error::LocalIo)?;
                send_command(
                    stream,
                    &Command::Get(FileMeta::new(meta.name.clone(), meta.size, meta.timestamp, offset)),
                    config.frame_deadline(),
                    sid,
                )?;
                self.open_inbound(meta, offset, temp_path, file, stream, config, sid, sink)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn open_inbound(
        &mut self,
        meta: FileMeta,
        offset: u64,
        temp_path: PathBuf,
        file: File,
        stream: &mut TcpStream,
        config: &Config,
        sid: SessionId,
        sink: &mut dyn InboundSink,
    ) -> Result<()> {
        let recv = RecvTransfer {
            name: meta.name,
            size: meta.size,
            timestamp: meta.timestamp,
            offset,
            temp_path,
            file,
            awaiting_crc: false,
        };
        self.inbound_active = Some(recv);
        if self.inbound_active.as_ref().map(|r| r.size) == Some(0) {
            // Zero-size file: resolved immediately, no data frames expected.
            self.finalize_inbound(stream, config, sid, &[], sink)?;
        }
        Ok(())
    }

    fn handle_data(
        &mut self,
        payload: &[u8],
        stream: &mut TcpStream,
        config: &Config,
        sid: SessionId,
        remote_addresses: &[Address],
        sink: &mut dyn InboundSink,
    ) -> Result<()> {
        let active = self
            .inbound_active
            .as_mut()
            .ok_or_else(|| Error::Protocol("data frame with no active inbound transfer".to_string()))?;
        if active.awaiting_crc {
            return Err(Error::Protocol(format!(
                "data frame for {} arrived while awaiting its CRC",
                active.name
            )));
        }

        let bytes = if self.options.plz_on() {
            binkp_plz::try_decompress(payload)
        } else {
            payload.to_vec()
        };
        let new_offset = active.offset + bytes.len() as u64;
        if new_offset > active.size {
            return Err(Error::Protocol(format!(
                "received more data than {} advertised ({} > {})",
                active.name, new_offset, active.size
            )));
        }
        active.file.write_all(&bytes).map_err(Error::LocalIo)?;
        active.offset = new_offset;
        self.stats.bytes_received += bytes.len() as u64;

        if active.offset == active.size {
            if self.options.use_crc {
                active.awaiting_crc = true;
            } else {
                self.finalize_inbound(stream, config, sid, remote_addresses, sink)?;
            }
        }
        Ok(())
    }

    fn handle_crc(
        &mut self,
        hex: &str,
        stream: &mut TcpStream,
        config: &Config,
        sid: SessionId,
        remote_addresses: &[Address],
        sink: &mut dyn InboundSink,
    ) -> Result<()> {
        let Some(active) = &self.inbound_active else {
            return Ok(());
        };
        if !active.awaiting_crc {
            return Ok(());
        }
        let expected = u32::from_str_radix(hex, 16).ok();
        let actual = crc32_of_file(&active.temp_path).map_err(Error::LocalIo)?;
        match expected {
            Some(expected) if expected == actual => {
                self.finalize_inbound(stream, config, sid, remote_addresses, sink)
            }
            _ => {
                let active = self.inbound_active.take().expect("checked above");
                log::warn!("{sid}: CRC mismatch on {}, discarding", active.name);
                let _ = fs::remove_file(&active.temp_path);
                Ok(())
            }
        }
    }

    fn finalize_inbound(
        &mut self,
        stream: &mut TcpStream,
        config: &Config,
        sid: SessionId,
        remote_addresses: &[Address],
        sink: &mut dyn InboundSink,
    ) -> Result<()> {
        let active = self.inbound_active.take().expect("finalize_inbound without an active transfer");
        sink.commit(
            &active.name,
            &active.temp_path,
            active.size,
            active.timestamp,
            remote_addresses,
        )
        .map_err(Error::LocalIo)?;
        send_command(
            stream,
            &Command::Got(binkp_types::FileAck::new(active.name.clone(), active.size, active.timestamp)),
            config.frame_deadline(),
            sid,
        )?;
        self.stats.files_received += 1;
        log::info!("{sid}: received {} ({} bytes)", active.name, active.size);
        Ok(())
    }

    fn temp_path(&self, config: &Config, name: &str) -> PathBuf {
        config.staging_dir.join(format!("{}.binkp-tmp", sanitize_name(name)))
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect()
}

fn crc32_of_file(path: &Path) -> std::io::Result<u32> {
    let mut file = File::open(path)?;
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}
