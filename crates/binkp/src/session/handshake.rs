//! Originator (`S0..S3`) and answerer (`R0..R3`) handshake paths.

use std::net::TcpStream;

use binkp_msg::options::{self, OptToken};
use binkp_msg::{Command, SessionSecurity};
use binkp_plz::PlzMode;
use binkp_types::{Address, Deadline};
use rand::RngCore;

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::state::{HandshakeResult, NegotiatedOptions, SessionId};
use crate::wire::{recv_command, send_command};

/// What the peer advertised in its `M_NUL OPT` lines during the handshake.
#[derive(Debug, Default)]
struct PeerOptions {
    nr: bool,
    nd: bool,
    plz: bool,
    cram_challenge: Option<String>,
}

fn absorb_opt_line(peer: &mut PeerOptions, arg: &str) {
    let Some(tokens) = options::parse_opt_line(arg) else {
        return;
    };
    for token in tokens {
        match token {
            OptToken::Nr => peer.nr = true,
            OptToken::Nd => peer.nd = true,
            OptToken::Plz => peer.plz = true,
            OptToken::CramMd5Challenge(c) => peer.cram_challenge = Some(c),
            OptToken::Crypt | OptToken::Other(_) => {}
        }
    }
}

fn local_opt_tokens(config: &Config, cram_challenge: Option<&str>) -> Vec<OptToken> {
    let mut tokens = Vec::new();
    if config.use_nr {
        tokens.push(OptToken::Nr);
    }
    if config.plz_mode != PlzMode::None {
        tokens.push(OptToken::Plz);
    }
    if let Some(challenge) = cram_challenge {
        tokens.push(OptToken::CramMd5Challenge(challenge.to_string()));
    }
    tokens
}

fn send_opt_and_adr(
    stream: &mut TcpStream,
    config: &Config,
    cram_challenge: Option<&str>,
    deadline: Deadline,
    sid: SessionId,
) -> Result<()> {
    let tokens = local_opt_tokens(config, cram_challenge);
    if !tokens.is_empty() {
        send_command(
            stream,
            &Command::Nul(options::render_opt_line(&tokens)),
            deadline,
            sid,
        )?;
    }
    if !config.system_name.is_empty() {
        send_command(stream, &Command::Nul(format!("SYS {}", config.system_name)), deadline, sid)?;
    }
    if !config.sysop_name.is_empty() {
        send_command(stream, &Command::Nul(format!("ZYZ {}", config.sysop_name)), deadline, sid)?;
    }
    if !config.location.is_empty() {
        send_command(stream, &Command::Nul(format!("LOC {}", config.location)), deadline, sid)?;
    }
    send_command(stream, &Command::Nul(format!("VER {}", config.version_string)), deadline, sid)?;
    send_command(stream, &Command::Adr(config.local_addresses.clone()), deadline, sid)?;
    Ok(())
}

fn negotiate_options(config: &Config, peer: &PeerOptions, secure: bool) -> Result<NegotiatedOptions> {
    let remote_plz_mode = if peer.plz { PlzMode::Supported } else { PlzMode::None };
    let plz = binkp_plz::negotiate(config.plz_mode, remote_plz_mode)?;
    Ok(NegotiatedOptions {
        use_crc: config.use_crc,
        use_nr: config.use_nr && peer.nr,
        use_nd: peer.nd,
        plz,
        secure,
    })
}

/// Runs the originator path: `S0` (connect, done by the caller) through
/// `S3` (receipt of `M_OK`).
pub fn run_originator(
    stream: &mut TcpStream,
    config: &Config,
    sid: SessionId,
    cancel: &CancelToken,
) -> Result<HandshakeResult> {
    let mut peer = PeerOptions::default();
    let mut remote_addresses: Vec<Address> = Vec::new();

    // S1: accumulate M_NUL/M_ADR from the peer until M_ADR arrives.
    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match recv_command(stream, config.frame_deadline(), sid)? {
            Command::Nul(arg) => absorb_opt_line(&mut peer, &arg),
            Command::Adr(addrs) => {
                remote_addresses = addrs;
                break;
            }
            Command::Bsy(reason) => {
                log::info!("{sid}: answerer is busy: {reason}");
                return Err(Error::Busy(reason));
            }
            Command::Err(reason) => return Err(Error::Protocol(format!("peer error: {reason}"))),
            other => {
                return Err(Error::Protocol(format!(
                    "unexpected {other:?} while awaiting M_ADR"
                )))
            }
        }
    }

    // S2: send our own options/address/password.
    send_opt_and_adr(stream, config, None, config.frame_deadline(), sid)?;
    let password = config.password.as_deref().unwrap_or("");
    let pwd_argument = binkp_auth::build_pwd_argument(password, peer.cram_challenge.as_deref())?;
    send_command(stream, &Command::Pwd(pwd_argument), config.frame_deadline(), sid)?;

    // S3: wait for M_OK.
    let security = loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match recv_command(stream, config.frame_deadline(), sid)? {
            Command::Ok(security) => break security,
            Command::Bsy(reason) => {
                log::info!("{sid}: answerer is busy: {reason}");
                return Err(Error::Busy(reason));
            }
            Command::Err(reason) => return Err(Error::Protocol(format!("authentication failed: {reason}"))),
            other => {
                return Err(Error::Protocol(format!(
                    "unexpected {other:?} while awaiting M_OK"
                )))
            }
        }
    };

    let options = negotiate_options(config, &peer, matches!(security, SessionSecurity::Secure))?;
    Ok(HandshakeResult {
        options,
        remote_addresses,
        security,
    })
}

/// Runs the answerer path: `R0` (accept, done by the caller) through
/// `R2`/`R3` (authentication resolved and `M_OK` sent).
pub fn run_answerer(
    stream: &mut TcpStream,
    config: &Config,
    sid: SessionId,
    cancel: &CancelToken,
) -> Result<HandshakeResult> {
    let cram_challenge = if config.use_cram {
        Some(generate_challenge())
    } else {
        None
    };

    // R0: advertise our options/address, optionally a CRAM-MD5 challenge.
    send_opt_and_adr(
        stream,
        config,
        cram_challenge.as_deref(),
        config.frame_deadline(),
        sid,
    )?;

    // R1: accumulate the originator's M_NUL/M_ADR until M_ADR arrives.
    let mut peer = PeerOptions::default();
    let remote_addresses: Vec<Address> = loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match recv_command(stream, config.frame_deadline(), sid)? {
            Command::Nul(arg) => absorb_opt_line(&mut peer, &arg),
            Command::Adr(addrs) => break addrs,
            other => {
                return Err(Error::Protocol(format!(
                    "unexpected {other:?} while awaiting M_ADR"
                )))
            }
        }
    };

    let known_with_password = config.password.is_some();

    let pwd_argument = loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match recv_command(stream, config.frame_deadline(), sid)? {
            Command::Pwd(arg) => break arg,
            Command::Nul(arg) => {
                absorb_opt_line(&mut peer, &arg);
                continue;
            }
            other => {
                return Err(Error::Protocol(format!(
                    "unexpected {other:?} while awaiting M_PWD"
                )))
            }
        }
    };

    let security = if known_with_password {
        // R2
        let expected = config.password.as_deref().unwrap_or("");
        match binkp_auth::verify_pwd_argument(&pwd_argument, expected, cram_challenge.as_deref()) {
            Ok(()) => {
                send_command(stream, &Command::Ok(SessionSecurity::Secure), config.frame_deadline(), sid)?;
                SessionSecurity::Secure
            }
            Err(e) => {
                send_command(
                    stream,
                    &Command::Err(format!("authentication failed: {e}")),
                    config.frame_deadline(),
                    sid,
                )
                .ok();
                return Err(e.into());
            }
        }
    } else {
        // R3: accept anything.
        send_command(stream, &Command::Ok(SessionSecurity::NonSecure), config.frame_deadline(), sid)?;
        SessionSecurity::NonSecure
    };

    let options = negotiate_options(config, &peer, matches!(security, SessionSecurity::Secure))?;
    Ok(HandshakeResult {
        options,
        remote_addresses,
        security,
    })
}

/// Sends `M_BSY` and nothing else; used when the embedder has decided to
/// refuse a connection before authentication (`M_BSY` is only legal from
/// the answerer, and only before authentication completes).
pub fn send_busy(stream: &mut TcpStream, config: &Config, reason: &str, sid: SessionId) -> Result<()> {
    send_command(stream, &Command::Bsy(reason.to_string()), config.frame_deadline(), sid)
}

fn generate_challenge() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
