//! Session orchestration: wires the handshake and transfer sub-protocols
//! together behind the two public entry points, [`dial`] and [`serve`].

mod handshake;
pub mod state;
mod transfer;

use std::net::TcpStream;

use crate::cancel::CancelToken;
use crate::collaborators::{InboundSink, OutboundScan};
use crate::config::Config;
use crate::error::Result;
use binkp_msg::Command;
use state::{HandshakeResult, Outcome, SessionId};

/// Dials `config.remote_host:config.remote_port` and runs the originator
/// side of a session (`S0..S3`, then the file-transfer phase) to completion.
pub fn dial(
    config: &Config,
    scan: &dyn OutboundScan,
    sink: &mut dyn InboundSink,
    cancel: &CancelToken,
) -> Result<Outcome> {
    let sid = SessionId::next();
    log::info!("{sid}: dialing {}:{}", config.remote_host, config.remote_port);
    let mut stream = binkp_transport::connect(&config.remote_host, config.remote_port, config.frame_deadline())?;

    let handshake = match handshake::run_originator(&mut stream, config, sid, cancel) {
        Ok(result) => result,
        Err(crate::error::Error::Busy(reason)) => {
            log::info!("{sid}: answerer busy: {reason}");
            return Ok(Outcome::Busy);
        }
        Err(e) => {
            emit_best_effort_error(&mut stream, config, sid, &e);
            return Err(e);
        }
    };

    run_transfer(&mut stream, config, sid, handshake, scan, sink, cancel)
}

/// Runs the answerer side of a session (`R0..R3`, then the file-transfer
/// phase) over an already-accepted `stream`.
///
/// If `refuse` is `Some(reason)`, the engine sends `M_BSY <reason>` and
/// returns without completing the handshake (`M_BSY` is only
/// legal from the answerer, before authentication completes).
pub fn serve(
    stream: &mut TcpStream,
    config: &Config,
    scan: &dyn OutboundScan,
    sink: &mut dyn InboundSink,
    cancel: &CancelToken,
    refuse: Option<&str>,
) -> Result<Outcome> {
    let sid = SessionId::next();
    log::info!("{sid}: serving an inbound connection");

    if let Some(reason) = refuse {
        handshake::send_busy(stream, config, reason, sid)?;
        return Ok(Outcome::Busy);
    }

    let handshake = match handshake::run_answerer(stream, config, sid, cancel) {
        Ok(result) => result,
        Err(e) => {
            emit_best_effort_error(stream, config, sid, &e);
            return Err(e);
        }
    };
    run_transfer(stream, config, sid, handshake, scan, sink, cancel)
}

fn run_transfer(
    stream: &mut TcpStream,
    config: &Config,
    sid: SessionId,
    handshake: HandshakeResult,
    scan: &dyn OutboundScan,
    sink: &mut dyn InboundSink,
    cancel: &CancelToken,
) -> Result<Outcome> {
    let session_deadline = config.session_deadline();
    let result = transfer::run(
        stream,
        config,
        handshake.options,
        sid,
        &handshake.remote_addresses,
        scan,
        sink,
        session_deadline,
        cancel,
    );
    match result {
        Ok(stats) => {
            log::info!(
                "{sid}: session complete: {} sent, {} received",
                stats.files_sent,
                stats.files_received
            );
            Ok(Outcome::Done(stats))
        }
        Err(e) => {
            emit_best_effort_error(stream, config, sid, &e);
            Err(e)
        }
    }
}

/// Writes `M_ERR <e>` on a best-effort basis: all errors are fatal to the
/// session, and the engine tries once to tell the peer why before closing,
/// but a failure to even write that frame (the peer may already be gone)
/// is not itself reported.
fn emit_best_effort_error(stream: &mut TcpStream, config: &Config, sid: SessionId, e: &crate::error::Error) {
    log::warn!("{sid}: session failed: {e}");
    let _ = binkp_msg::write_to(
        stream,
        true,
        &Command::Err(format!("{e}")).to_payload(),
        config.frame_deadline(),
    );
}
