//! The 12-byte command field of a message header.

use std::fmt;

use serde::Serialize;
use serde::Serializer;

use super::header::COMMAND_SIZE;
use crate::p2p::error::HeaderError;

pub const VERSION: Command = Command::from_static("version");
pub const VERACK: Command = Command::from_static("verack");
pub const PING: Command = Command::from_static("ping");
pub const PONG: Command = Command::from_static("pong");
pub const ADDR: Command = Command::from_static("addr");
pub const ADDRV2: Command = Command::from_static("addrv2");
pub const SENDADDRV2: Command = Command::from_static("sendaddrv2");
pub const GETADDR: Command = Command::from_static("getaddr");
pub const INV: Command = Command::from_static("inv");
pub const GETDATA: Command = Command::from_static("getdata");
pub const NOTFOUND: Command = Command::from_static("notfound");
pub const GETBLOCKS: Command = Command::from_static("getblocks");
pub const GETHEADERS: Command = Command::from_static("getheaders");
pub const HEADERS: Command = Command::from_static("headers");
pub const BLOCK: Command = Command::from_static("block");
pub const TX: Command = Command::from_static("tx");
pub const MEMPOOL: Command = Command::from_static("mempool");
pub const SENDHEADERS: Command = Command::from_static("sendheaders");
pub const SENDCMPCT: Command = Command::from_static("sendcmpct");
pub const CMPCTBLOCK: Command = Command::from_static("cmpctblock");
pub const GETBLOCKTXN: Command = Command::from_static("getblocktxn");
pub const BLOCKTXN: Command = Command::from_static("blocktxn");
pub const THINBLOCK: Command = Command::from_static("thinblock");
pub const XTHINBLOCK: Command = Command::from_static("xthinblock");
pub const FEEFILTER: Command = Command::from_static("feefilter");
pub const FILTERLOAD: Command = Command::from_static("filterload");
pub const FILTERADD: Command = Command::from_static("filteradd");
pub const FILTERCLEAR: Command = Command::from_static("filterclear");
pub const WTXIDRELAY: Command = Command::from_static("wtxidrelay");

/// Message type identifier, stored exactly as it appears on the wire.
///
/// A well-formed command is printable ASCII (`0x20..=0x7e`) followed only by
/// NUL padding up to [`COMMAND_SIZE`] bytes. Every `Command` value is
/// well-formed, so [`Command::as_str`] is infallible.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Command([u8; COMMAND_SIZE]);

const fn is_command_char(byte: u8) -> bool {
    byte >= 0x20 && byte <= 0x7e
}

impl Command {
    /// Build a command from a name known at compile time.
    ///
    /// Panics (at compile time, when used in a `const`) if the name is longer
    /// than [`COMMAND_SIZE`] or not printable ASCII.
    pub const fn from_static(name: &'static str) -> Self {
        let bytes = name.as_bytes();
        assert!(bytes.len() <= COMMAND_SIZE, "command name too long");

        let mut field = [0u8; COMMAND_SIZE];
        let mut i = 0;
        while i < bytes.len() {
            assert!(is_command_char(bytes[i]), "command name must be printable ascii");
            field[i] = bytes[i];
            i += 1;
        }
        Self(field)
    }

    pub fn new(name: &str) -> Result<Self, HeaderError> {
        if name.len() > COMMAND_SIZE {
            return Err(HeaderError::CommandTooLong(name.to_owned()));
        }

        let mut field = [0u8; COMMAND_SIZE];
        field[..name.len()].copy_from_slice(name.as_bytes());
        if name.as_bytes().contains(&0) {
            return Err(HeaderError::InvalidCommand(field));
        }
        Self::from_wire(field)
    }

    /// Validate the command field of a received header.
    pub fn from_wire(field: [u8; COMMAND_SIZE]) -> Result<Self, HeaderError> {
        let mut padding = false;
        for &byte in &field {
            if padding {
                if byte != 0 {
                    return Err(HeaderError::InvalidCommand(field));
                }
            } else if byte == 0 {
                padding = true;
            } else if !is_command_char(byte) {
                return Err(HeaderError::InvalidCommand(field));
            }
        }
        Ok(Self(field))
    }

    /// The command name with trailing NULs stripped.
    pub fn as_str(&self) -> &str {
        let len = self
            .0
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or(COMMAND_SIZE);

        // well-formedness is checked on construction
        std::str::from_utf8(&self.0[..len]).unwrap_or_default()
    }

    /// The NUL-padded wire representation.
    pub fn as_bytes(&self) -> &[u8; COMMAND_SIZE] {
        &self.0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command({:?})", self.as_str())
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
