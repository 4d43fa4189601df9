//! Payload shape validation
//!
//! Checks a completed message's payload length against what its command
//! requires. A mismatch raises the peer's misbehavior score but the message
//! is still handed on; payload contents are not inspected here.

use std::collections::HashMap;
use std::fmt::Display;

use serde::Serialize;
use tracing::warn;

use super::command::Command;
use super::command::ADDR;
use super::command::BLOCK;
use super::command::FEEFILTER;
use super::command::FILTERCLEAR;
use super::command::GETADDR;
use super::command::GETBLOCKS;
use super::command::GETDATA;
use super::command::GETHEADERS;
use super::command::HEADERS;
use super::command::INV;
use super::command::MEMPOOL;
use super::command::NOTFOUND;
use super::command::PING;
use super::command::PONG;
use super::command::SENDADDRV2;
use super::command::SENDCMPCT;
use super::command::SENDHEADERS;
use super::command::TX;
use super::command::VERACK;
use super::command::VERSION;
use super::command::WTXIDRELAY;
use super::message::NetMessage;
use crate::p2p::peer::ledger::PeerStandingHandle;
use crate::p2p::peer::sanction::MisbehaviorReason;
use crate::p2p::peer::sanction::PAYLOAD_LENGTH_MISMATCH_SEVERITY;
use crate::p2p::peer::sanction::PAYLOAD_TOO_SHORT_SEVERITY;

/// Expected payload length of one command.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SizeRule {
    Exact(u32),
    Minimum(u32),
    Unconstrained,
}

impl Display for SizeRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizeRule::Exact(n) => write!(f, "exactly {n} bytes"),
            SizeRule::Minimum(n) => write!(f, "at least {n} bytes"),
            SizeRule::Unconstrained => write!(f, "any length"),
        }
    }
}

/// A payload that broke its command's size rule.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub enum ShapeViolation {
    LengthMismatch {
        command: Command,
        expected: u32,
        actual: u32,
    },
    TooShort {
        command: Command,
        minimum: u32,
        actual: u32,
    },
}

impl ShapeViolation {
    pub fn command(&self) -> Command {
        match *self {
            ShapeViolation::LengthMismatch { command, .. } => command,
            ShapeViolation::TooShort { command, .. } => command,
        }
    }

    pub fn reason(&self) -> MisbehaviorReason {
        match *self {
            ShapeViolation::LengthMismatch {
                command, expected, ..
            } => MisbehaviorReason::PayloadLengthMismatch { command, expected },
            ShapeViolation::TooShort {
                command, minimum, ..
            } => MisbehaviorReason::PayloadTooShort { command, minimum },
        }
    }

    pub fn penalty(&self) -> u32 {
        match self {
            ShapeViolation::LengthMismatch { .. } => PAYLOAD_LENGTH_MISMATCH_SEVERITY,
            ShapeViolation::TooShort { .. } => PAYLOAD_TOO_SHORT_SEVERITY,
        }
    }
}

impl Display for ShapeViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeViolation::LengthMismatch {
                command,
                expected,
                actual,
            } => write!(f, "{command} payload is {actual} bytes, expected {expected}"),
            ShapeViolation::TooShort {
                command,
                minimum,
                actual,
            } => write!(f, "{command} payload is {actual} bytes, expected at least {minimum}"),
        }
    }
}

/// Table of payload size rules, one per command. Commands without an entry
/// are unconstrained.
#[derive(Debug, Clone)]
pub struct PayloadShapeValidator {
    rules: HashMap<Command, SizeRule>,
}

impl PayloadShapeValidator {
    /// A validator with an empty table.
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub fn with_rule(mut self, command: Command, rule: SizeRule) -> Self {
        self.set_rule(command, rule);
        self
    }

    pub fn set_rule(&mut self, command: Command, rule: SizeRule) {
        if rule == SizeRule::Unconstrained {
            self.rules.remove(&command);
        } else {
            self.rules.insert(command, rule);
        }
    }

    pub fn rule_for(&self, command: &Command) -> SizeRule {
        self.rules
            .get(command)
            .copied()
            .unwrap_or(SizeRule::Unconstrained)
    }

    pub fn check(&self, command: Command, payload_length: u32) -> Result<(), ShapeViolation> {
        match self.rule_for(&command) {
            SizeRule::Exact(expected) if payload_length != expected => {
                Err(ShapeViolation::LengthMismatch {
                    command,
                    expected,
                    actual: payload_length,
                })
            }
            SizeRule::Minimum(minimum) if payload_length < minimum => {
                Err(ShapeViolation::TooShort {
                    command,
                    minimum,
                    actual: payload_length,
                })
            }
            _ => Ok(()),
        }
    }

    /// Check `message` and punish the sending peer on a mismatch. The
    /// violation is returned for the caller to log; delivery is unaffected.
    pub fn validate(
        &self,
        standing: &PeerStandingHandle,
        message: &NetMessage,
    ) -> Option<ShapeViolation> {
        let violation = self
            .check(message.command(), message.payload_length())
            .err()?;

        warn!(
            "Peer {} sent malformed message: {violation}",
            standing.peer_id()
        );
        standing.increase_penalty(violation.penalty(), violation.reason());
        Some(violation)
    }
}

impl Default for PayloadShapeValidator {
    fn default() -> Self {
        let exact_0 = [
            VERACK, GETADDR, MEMPOOL, SENDHEADERS, FILTERCLEAR, SENDADDRV2, WTXIDRELAY,
        ]
        .map(|command| (command, SizeRule::Exact(0)));
        let exact_8 = [PING, PONG, FEEFILTER].map(|command| (command, SizeRule::Exact(8)));
        let minimum_37 = [GETHEADERS, GETBLOCKS].map(|command| (command, SizeRule::Minimum(37)));
        let minimum_1 =
            [INV, GETDATA, NOTFOUND, HEADERS, ADDR].map(|command| (command, SizeRule::Minimum(1)));
        let other = [
            (SENDCMPCT, SizeRule::Exact(9)),
            (VERSION, SizeRule::Minimum(46)),
            (BLOCK, SizeRule::Minimum(81)),
            (TX, SizeRule::Minimum(10)),
        ];

        let rules = exact_0
            .into_iter()
            .chain(exact_8)
            .chain(minimum_37)
            .chain(minimum_1)
            .chain(other)
            .collect();
        Self { rules }
    }
}
