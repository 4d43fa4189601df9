use std::fmt::Display;

use serde::Serialize;

use crate::p2p::protocol::command::Command;

pub const PAYLOAD_LENGTH_MISMATCH_SEVERITY: u32 = 20;
pub const PAYLOAD_TOO_SHORT_SEVERITY: u32 = 10;

/// Why a peer's misbehavior score was raised.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MisbehaviorReason {
    /// Payload length differs from the fixed length of its command.
    PayloadLengthMismatch { command: Command, expected: u32 },

    /// Payload is shorter than the minimum for its command.
    PayloadTooShort { command: Command, minimum: u32 },

    ChecksumMismatch { command: Command },

    /// Header declared a message above the size cap.
    OversizedMessage { command: Command },

    /// Header with foreign magic or a malformed command field.
    MalformedHeader,
}

impl Display for MisbehaviorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MisbehaviorReason::PayloadLengthMismatch { command, expected } => {
                write!(f, "{command} payload must be exactly {expected} bytes")
            }
            MisbehaviorReason::PayloadTooShort { command, minimum } => {
                write!(f, "{command} payload must be at least {minimum} bytes")
            }
            MisbehaviorReason::ChecksumMismatch { command } => {
                write!(f, "{command} checksum mismatch")
            }
            MisbehaviorReason::OversizedMessage { command } => {
                write!(f, "oversized {command} message")
            }
            MisbehaviorReason::MalformedHeader => write!(f, "malformed message header"),
        }
    }
}
