//! Framing error types.

use std::io;

use thiserror::Error;

use super::peer::ledger::PeerId;
use super::protocol::command::Command;
use super::protocol::header::COMMAND_SIZE;
use super::transport::framing::FeedOutcome;
use crate::config_models::network::MAGIC_SIZE;

/// Reasons a 24-byte header cannot be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum HeaderError {
    /// The header belongs to another network.
    #[error("invalid network magic: expected {expected:02x?}, got {actual:02x?}")]
    InvalidMagic {
        expected: [u8; MAGIC_SIZE],
        actual: [u8; MAGIC_SIZE],
    },

    /// The command field is not printable ASCII followed by NUL padding.
    #[error("malformed command field: {0:02x?}")]
    InvalidCommand([u8; COMMAND_SIZE]),

    /// A command name does not fit the 12-byte command field.
    #[error("command name too long: {0:?}")]
    CommandTooLong(String),

    /// A buffer meant to hold a whole frame is shorter than a header.
    #[error("frame of {0} bytes is shorter than a message header")]
    FrameTooShort(usize),

    /// A payload does not fit the 32-bit length field.
    #[error("payload of {0} bytes does not fit the length field")]
    PayloadTooLong(usize),
}

/// Failures that end a [`feed`](crate::p2p::peer::connection::PeerConnection::feed)
/// call. The connection is not expected to yield valid messages afterwards.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FramingError {
    #[error("malformed message header: {0}")]
    MalformedHeader(#[from] HeaderError),

    /// The header declares a message larger than the size cap for its
    /// command. Raised before any payload byte is buffered.
    #[error("message too large: {command} declares {size} bytes (max: {max})")]
    MessageTooLarge { command: Command, size: u64, max: u64 },

    /// I/O error of the underlying stream, only raised by the codec.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FramingError {
    /// `true` for errors caused by the bytes the peer sent, as opposed to
    /// local I/O failures.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::MalformedHeader(_) | Self::MessageTooLarge { .. }
        )
    }
}

/// A rejected feed call.
///
/// Messages that completed earlier in the same call have already been handed
/// on; `outcome` reports them so the caller can process them before acting
/// on the error.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct FeedError {
    pub outcome: FeedOutcome,

    #[source]
    pub error: FramingError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum LedgerError {
    #[error("no misbehavior entry for peer {0}")]
    UnknownPeer(PeerId),
}
