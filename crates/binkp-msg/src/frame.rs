//! The two-octet-header Binkp frame: `encode`/`decode_from`.

use std::io::{Read, Write};
use std::time::Duration;

use binkp_types::Deadline;

use crate::error::FrameError;

/// Maximum payload size a single frame may carry (15-bit size field).
pub const MAX_PAYLOAD: usize = 0x7fff;

const COMMAND_BIT: u16 = 0x8000;

/// A decoded frame: either a command frame or an opaque chunk of file data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Command(Vec<u8>),
    Data(Vec<u8>),
}

impl Frame {
    pub fn is_command(&self) -> bool {
        matches!(self, Frame::Command(_))
    }

    pub fn payload(&self) -> &[u8] {
        match self {
            Frame::Command(p) | Frame::Data(p) => p,
        }
    }
}

/// Blocking I/O with a per-call read/write timeout, implemented for
/// `std::net::TcpStream`. The frame codec bounds every header and payload
/// read/write by the remaining time on a [`Deadline`] via this trait,
/// rather than assuming any particular transport.
pub trait DeadlinedIo: Read + Write {
    fn set_read_timeout(&self, dur: Option<Duration>) -> std::io::Result<()>;
    fn set_write_timeout(&self, dur: Option<Duration>) -> std::io::Result<()>;
}

impl DeadlinedIo for std::net::TcpStream {
    fn set_read_timeout(&self, dur: Option<Duration>) -> std::io::Result<()> {
        std::net::TcpStream::set_read_timeout(self, dur)
    }

    fn set_write_timeout(&self, dur: Option<Duration>) -> std::io::Result<()> {
        std::net::TcpStream::set_write_timeout(self, dur)
    }
}

/// Encodes a single frame's on-wire representation.
pub fn encode(is_command: bool, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::FrameTooLarge(payload.len()));
    }
    let mut header = payload.len() as u16;
    if is_command {
        header |= COMMAND_BIT;
    }
    let mut out = Vec::with_capacity(2 + payload.len());
    out.extend_from_slice(&header.to_be_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Writes a frame to `io`, bounding the write by the deadline's remaining time.
pub fn write_to<IO: DeadlinedIo>(
    io: &mut IO,
    is_command: bool,
    payload: &[u8],
    deadline: Deadline,
) -> Result<(), FrameError> {
    let bytes = encode(is_command, payload)?;
    io.set_write_timeout(Some(non_zero_remaining(deadline, "frame write")?))?;
    io.write_all(&bytes)?;
    Ok(())
}

/// Reads exactly one frame, bounding header and payload reads by `deadline`.
pub fn decode_from<IO: DeadlinedIo>(io: &mut IO, deadline: Deadline) -> Result<Frame, FrameError> {
    let mut header_bytes = [0u8; 2];
    io.set_read_timeout(Some(non_zero_remaining(deadline, "frame header")?))?;
    read_exact_mapped(io, &mut header_bytes, "frame header")?;

    let header = u16::from_be_bytes(header_bytes);
    let is_command = header & COMMAND_BIT != 0;
    let size = (header & !COMMAND_BIT) as usize;

    let mut payload = vec![0u8; size];
    if size > 0 {
        io.set_read_timeout(Some(non_zero_remaining(deadline, "frame payload")?))?;
        read_exact_mapped(io, &mut payload, "frame payload")?;
    }

    Ok(if is_command {
        Frame::Command(payload)
    } else {
        Frame::Data(payload)
    })
}

fn non_zero_remaining(deadline: Deadline, what: &'static str) -> Result<Duration, FrameError> {
    let remaining = deadline.remaining();
    if remaining.is_zero() {
        return Err(FrameError::Timeout(what));
    }
    Ok(remaining)
}

fn read_exact_mapped<R: Read>(r: &mut R, buf: &mut [u8], what: &'static str) -> Result<(), FrameError> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => {
                return if filled == 0 {
                    Err(FrameError::ConnectionClosed(what))
                } else {
                    Err(FrameError::ShortRead {
                        expected: buf.len(),
                        got: filled,
                    })
                };
            }
            Ok(n) => filled += n,
            Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                return Err(FrameError::Timeout(what));
            }
            Err(e) => return Err(FrameError::Io(e)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration as StdDuration;

    impl DeadlinedIo for Cursor<Vec<u8>> {
        fn set_read_timeout(&self, _dur: Option<Duration>) -> std::io::Result<()> {
            Ok(())
        }
        fn set_write_timeout(&self, _dur: Option<Duration>) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn encodes_command_header_bit() {
        let bytes = encode(true, b"\x00hi").unwrap();
        assert_eq!(bytes[0] & 0x80, 0x80);
        assert_eq!(&bytes[2..], b"\x00hi");
    }

    #[test]
    fn rejects_oversized_payload() {
        let payload = vec![0u8; MAX_PAYLOAD + 1];
        assert!(matches!(encode(false, &payload), Err(FrameError::FrameTooLarge(_))));
    }

    #[test]
    fn round_trips_through_a_cursor() {
        let bytes = encode(true, b"hello").unwrap();
        let mut cursor = Cursor::new(bytes);
        let deadline = Deadline::after(StdDuration::from_secs(1));
        let frame = decode_from(&mut cursor, deadline).unwrap();
        assert_eq!(frame, Frame::Command(b"hello".to_vec()));
    }

    #[test]
    fn zero_length_frame_is_legal() {
        let bytes = encode(false, b"").unwrap();
        assert_eq!(bytes.len(), 2);
        let mut cursor = Cursor::new(bytes);
        let deadline = Deadline::after(StdDuration::from_secs(1));
        let frame = decode_from(&mut cursor, deadline).unwrap();
        assert_eq!(frame, Frame::Data(vec![]));
    }
}
