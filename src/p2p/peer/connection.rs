//! Inbound side of one peer connection.

use std::collections::vec_deque::Drain;
use std::collections::VecDeque;
use std::sync::Arc;

use tracing::warn;

use super::ledger::PeerId;
use super::ledger::PeerStandingHandle;
use super::sanction::MisbehaviorReason;
use crate::p2p::error::FeedError;
use crate::p2p::error::FramingError;
use crate::p2p::protocol::message::NetMessage;
use crate::p2p::protocol::policy::InboundPolicy;
use crate::p2p::protocol::size_cap::ConsensusSnapshot;
use crate::p2p::transport::framing::Completion;
use crate::p2p::transport::framing::FeedOutcome;
use crate::p2p::transport::framing::InFlightMessage;
use crate::p2p::transport::framing::StreamDeframer;

/// Assembles the messages a peer sends and queues them until the node gets
/// around to processing them.
///
/// Owned by the task serving the connection. The only state shared with
/// other tasks is the peer's misbehavior entry.
#[derive(Debug)]
pub struct PeerConnection {
    id: PeerId,
    version: Option<u32>,
    deframer: StreamDeframer,
    received: VecDeque<NetMessage>,
    standing: PeerStandingHandle,
    policy: Arc<InboundPolicy>,
}

impl PeerConnection {
    pub fn new(id: PeerId, policy: Arc<InboundPolicy>, standing: PeerStandingHandle) -> Self {
        Self {
            id,
            version: None,
            deframer: StreamDeframer::new(policy.network, policy.size_cap.clone()),
            received: VecDeque::new(),
            standing,
            policy,
        }
    }

    /// Process bytes received from the peer.
    ///
    /// Complete messages with a matching checksum are checked against the
    /// payload shape table and queued, shape violations included. An error
    /// means the peer sent a malformed header or an oversized message; the
    /// caller decides whether to keep the connection. Messages completed
    /// before the failure stay queued and are counted in the error.
    pub fn feed(
        &mut self,
        bytes: &[u8],
        consensus: ConsensusSnapshot,
    ) -> Result<FeedOutcome, FeedError> {
        let Self {
            deframer,
            received,
            standing,
            policy,
            ..
        } = self;

        let result = deframer.feed(bytes, consensus, |completion| match completion {
            Completion::Delivered(message) => {
                policy.validator.validate(standing, &message);
                received.push_back(message);
            }
            Completion::ChecksumMismatch(header) => {
                if let Some(penalty) = policy.misbehavior.checksum_failure_penalty {
                    standing.increase_penalty(
                        penalty,
                        MisbehaviorReason::ChecksumMismatch {
                            command: header.command,
                        },
                    );
                }
            }
        });

        if let Err(rejected) = &result {
            warn!("Framing error from peer {}: {}", self.id, rejected.error);
            self.punish_framing_violation(&rejected.error);
        }
        result
    }

    fn punish_framing_violation(&self, error: &FramingError) {
        if !error.is_protocol_violation() {
            return;
        }
        let Some(penalty) = self.policy.misbehavior.framing_violation_penalty else {
            return;
        };
        let reason = match error {
            FramingError::MessageTooLarge { command, .. } => MisbehaviorReason::OversizedMessage {
                command: *command,
            },
            _ => MisbehaviorReason::MalformedHeader,
        };
        self.standing.increase_penalty(penalty, reason);
    }

    /// Take all queued messages, oldest first.
    pub fn drain(&mut self) -> Drain<'_, NetMessage> {
        self.received.drain(..)
    }

    pub fn pop_received(&mut self) -> Option<NetMessage> {
        self.received.pop_front()
    }

    pub fn received_len(&self) -> usize {
        self.received.len()
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Protocol version negotiated in the handshake, if it has completed.
    pub fn version(&self) -> Option<u32> {
        self.version
    }

    pub fn set_version(&mut self, version: u32) {
        self.version = Some(version);
    }

    pub fn standing(&self) -> &PeerStandingHandle {
        &self.standing
    }

    pub fn in_flight(&self) -> Option<&InFlightMessage> {
        self.deframer.in_flight()
    }
}
