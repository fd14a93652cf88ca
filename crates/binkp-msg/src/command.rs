//! The closed `Command` set and its `(identifier, argument)` wire encoding.

use binkp_types::{Address, FileAck, FileMeta};

use crate::error::FrameError;
use crate::frame::Frame;

/// Numeric command identifiers, carried as the first payload byte of a
/// command frame.
pub mod id {
    pub const M_NUL: u8 = 0;
    pub const M_ADR: u8 = 1;
    pub const M_PWD: u8 = 2;
    pub const M_FILE: u8 = 3;
    pub const M_OK: u8 = 4;
    pub const M_EOB: u8 = 5;
    pub const M_GOT: u8 = 6;
    pub const M_ERR: u8 = 7;
    pub const M_BSY: u8 = 8;
    pub const M_GET: u8 = 9;
    pub const M_SKIP: u8 = 10;
}

/// Whether a session authenticated under a secure or non-secure channel,
/// as carried in the `M_OK` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSecurity {
    Secure,
    NonSecure,
}

impl SessionSecurity {
    fn as_str(self) -> &'static str {
        match self {
            SessionSecurity::Secure => "secure",
            SessionSecurity::NonSecure => "non-secure",
        }
    }
}

/// The closed Binkp command set. Implementations dispatch on this variant
/// rather than on the raw numeric identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Nul(String),
    Adr(Vec<Address>),
    Pwd(String),
    File(FileMeta),
    Ok(SessionSecurity),
    Eob,
    Got(FileAck),
    Err(String),
    Bsy(String),
    Get(FileMeta),
    Skip(FileAck),
}

impl Command {
    pub fn id(&self) -> u8 {
        match self {
            Command::Nul(_) => id::M_NUL,
            Command::Adr(_) => id::M_ADR,
            Command::Pwd(_) => id::M_PWD,
            Command::File(_) => id::M_FILE,
            Command::Ok(_) => id::M_OK,
            Command::Eob => id::M_EOB,
            Command::Got(_) => id::M_GOT,
            Command::Err(_) => id::M_ERR,
            Command::Bsy(_) => id::M_BSY,
            Command::Get(_) => id::M_GET,
            Command::Skip(_) => id::M_SKIP,
        }
    }

    fn name(&self) -> &'static str {
        name_of(self.id())
    }

    /// Renders the textual argument (everything after the identifier byte).
    fn render_arg(&self) -> String {
        match self {
            Command::Nul(arg) => arg.clone(),
            Command::Adr(addrs) => addrs
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(" "),
            Command::Pwd(arg) => arg.clone(),
            Command::File(meta) => render_file_meta(meta),
            Command::Ok(sec) => sec.as_str().to_string(),
            Command::Eob => String::new(),
            Command::Got(ack) => render_file_ack(ack),
            Command::Err(msg) => msg.clone(),
            Command::Bsy(msg) => msg.clone(),
            Command::Get(meta) => render_file_meta(meta),
            Command::Skip(ack) => render_file_ack(ack),
        }
    }

    /// Encodes this command into its on-wire command-frame payload
    /// (identifier byte followed by the textual argument).
    pub fn to_payload(&self) -> Vec<u8> {
        let arg = self.render_arg();
        let mut payload = Vec::with_capacity(1 + arg.len());
        payload.push(self.id());
        payload.extend_from_slice(arg.as_bytes());
        payload
    }

    /// Parses a command frame's payload into a typed `Command`.
    pub fn from_payload(payload: &[u8]) -> Result<Command, FrameError> {
        let (&command_id, rest) = payload
            .split_first()
            .ok_or(FrameError::InvalidCommand(0))?;
        let arg = std::str::from_utf8(rest)
            .map_err(|_| FrameError::InvalidArgument)?
            .trim_end_matches(['\0', ' ', '\r', '\n']);

        Ok(match command_id {
            id::M_NUL => Command::Nul(arg.to_string()),
            id::M_ADR => Command::Adr(parse_addresses(arg)?),
            id::M_PWD => Command::Pwd(arg.to_string()),
            id::M_FILE => Command::File(parse_file_meta(arg, "M_FILE")?),
            id::M_OK => Command::Ok(parse_ok(arg)?),
            id::M_EOB => Command::Eob,
            id::M_GOT => Command::Got(parse_file_ack(arg, "M_GOT")?),
            id::M_ERR => Command::Err(arg.to_string()),
            id::M_BSY => Command::Bsy(arg.to_string()),
            id::M_GET => Command::Get(parse_file_meta(arg, "M_GET")?),
            id::M_SKIP => Command::Skip(parse_file_ack(arg, "M_SKIP")?),
            other => return Err(FrameError::InvalidCommand(other)),
        })
    }

    /// Parses a decoded [`Frame::Command`] payload. Fails if `frame` is a
    /// data frame.
    pub fn from_frame(frame: &Frame) -> Result<Command, FrameError> {
        match frame {
            Frame::Command(payload) => Command::from_payload(payload),
            Frame::Data(_) => Err(FrameError::MalformedCommand {
                command: "?",
                argument: String::new(),
                reason: "data frame is not a command frame",
            }),
        }
    }
}

fn name_of(id: u8) -> &'static str {
    match id {
        id::M_NUL => "M_NUL",
        id::M_ADR => "M_ADR",
        id::M_PWD => "M_PWD",
        id::M_FILE => "M_FILE",
        id::M_OK => "M_OK",
        id::M_EOB => "M_EOB",
        id::M_GOT => "M_GOT",
        id::M_ERR => "M_ERR",
        id::M_BSY => "M_BSY",
        id::M_GET => "M_GET",
        id::M_SKIP => "M_SKIP",
        _ => "?",
    }
}

fn parse_addresses(arg: &str) -> Result<Vec<Address>, FrameError> {
    arg.split_whitespace()
        .map(|token| {
            token.parse().map_err(|_| FrameError::MalformedCommand {
                command: "M_ADR",
                argument: token.to_string(),
                reason: "not a valid zone:net/node[.point][@domain] address",
            })
        })
        .collect()
}

fn render_file_meta(meta: &FileMeta) -> String {
    format!("{} {} {} {}", meta.name, meta.size, meta.timestamp, meta.offset)
}

fn render_file_ack(ack: &FileAck) -> String {
    format!("{} {} {}", ack.name, ack.size, ack.timestamp)
}

/// Splits `"<name...> <size> <timestamp> <offset>"`, tolerating spaces in
/// the name by taking the last three whitespace-separated fields as the
/// numeric ones.
fn parse_file_meta(arg: &str, command: &'static str) -> Result<FileMeta, FrameError> {
    let fields: Vec<&str> = arg.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(FrameError::MalformedCommand {
            command,
            argument: arg.to_string(),
            reason: "expected <name> <size> <timestamp> <offset>",
        });
    }
    let n = fields.len();
    let name = fields[..n - 3].join(" ");
    let size = parse_u64(fields[n - 3], command, arg)?;
    let timestamp = parse_u64(fields[n - 2], command, arg)?;
    let offset = parse_u64(fields[n - 1], command, arg)?;
    Ok(FileMeta::new(name, size, timestamp, offset))
}

fn parse_file_ack(arg: &str, command: &'static str) -> Result<FileAck, FrameError> {
    let fields: Vec<&str> = arg.split_whitespace().collect();
    if fields.len() < 3 {
        return Err(FrameError::MalformedCommand {
            command,
            argument: arg.to_string(),
            reason: "expected <name> <size> <timestamp>",
        });
    }
    let n = fields.len();
    let name = fields[..n - 2].join(" ");
    let size = parse_u64(fields[n - 2], command, arg)?;
    let timestamp = parse_u64(fields[n - 1], command, arg)?;
    Ok(FileAck::new(name, size, timestamp))
}

fn parse_u64(field: &str, command: &'static str, arg: &str) -> Result<u64, FrameError> {
    field.parse().map_err(|_| FrameError::MalformedCommand {
        command,
        argument: arg.to_string(),
        reason: "non-numeric field",
    })
}

fn parse_ok(arg: &str) -> Result<SessionSecurity, FrameError> {
    match arg {
        "secure" => Ok(SessionSecurity::Secure),
        "non-secure" => Ok(SessionSecurity::NonSecure),
        _ => Err(FrameError::MalformedCommand {
            command: "M_OK",
            argument: arg.to_string(),
            reason: "expected \"secure\" or \"non-secure\"",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_file_offer() {
        let cmd = Command::File(FileMeta::new("hello.txt", 5, 0, 0));
        let payload = cmd.to_payload();
        assert_eq!(Command::from_payload(&payload).unwrap(), cmd);
    }

    #[test]
    fn round_trips_eob_with_empty_arg() {
        let payload = Command::Eob.to_payload();
        assert_eq!(payload, vec![id::M_EOB]);
        assert_eq!(Command::from_payload(&payload).unwrap(), Command::Eob);
    }

    #[test]
    fn round_trips_addresses() {
        let addrs = vec!["2:345/6".parse().unwrap(), "1:2/3.4".parse().unwrap()];
        let cmd = Command::Adr(addrs);
        let payload = cmd.to_payload();
        assert_eq!(Command::from_payload(&payload).unwrap(), cmd);
    }

    #[test]
    fn rejects_unknown_identifier() {
        assert!(matches!(
            Command::from_payload(&[99, b'x']),
            Err(FrameError::InvalidCommand(99))
        ));
    }

    #[test]
    fn name_of_is_used_for_diagnostics() {
        assert_eq!(Command::Eob.name(), "M_EOB");
    }
}
