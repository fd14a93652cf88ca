//! Thin helpers over [`binkp_msg`] for sending/receiving commands and data
//! frames on a `TcpStream`, with session-id-tagged logging.

use std::net::TcpStream;

use binkp_msg::{Command, Frame};
use binkp_types::Deadline;

use crate::error::{Error, Result};
use crate::session::state::SessionId;

pub fn send_command(stream: &mut TcpStream, cmd: &Command, deadline: Deadline, sid: SessionId) -> Result<()> {
    log::debug!("{sid}: -> {cmd:?}");
    let payload = cmd.to_payload();
    binkp_msg::write_to(stream, true, &payload, deadline)?;
    Ok(())
}

pub fn send_data(stream: &mut TcpStream, payload: &[u8], deadline: Deadline, sid: SessionId) -> Result<()> {
    log::trace!("{sid}: -> data frame ({} bytes)", payload.len());
    binkp_msg::write_to(stream, false, payload, deadline)?;
    Ok(())
}

pub fn recv_frame(stream: &mut TcpStream, deadline: Deadline) -> Result<Frame> {
    Ok(binkp_msg::decode_from(stream, deadline)?)
}

/// Reads the next frame and requires it to be a command frame, per the
/// strict phase separation of the handshake: no data frames
/// are legal before the transfer state begins.
pub fn recv_command(stream: &mut TcpStream, deadline: Deadline, sid: SessionId) -> Result<Command> {
    match recv_frame(stream, deadline)? {
        Frame::Command(payload) => {
            let cmd = Command::from_payload(&payload)?;
            log::debug!("{sid}: <- {cmd:?}");
            Ok(cmd)
        }
        Frame::Data(_) => Err(Error::Protocol(
            "received a data frame before the transfer state began".to_string(),
        )),
    }
}
