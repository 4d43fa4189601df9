//! Upper bound on the size of a single inbound message.
//!
//! Block-carrying messages are capped by the consensus block size rule, so
//! the cap follows protocol upgrades that raise the block size. Everything
//! else shares one fixed generic maximum.

use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use super::command::Command;
use super::command::BLOCK;
use super::command::BLOCKTXN;
use super::command::CMPCTBLOCK;
use super::command::THINBLOCK;
use super::command::XTHINBLOCK;
use super::header::MessageHeader;
use crate::p2p::error::FramingError;

/// Largest message accepted for commands that do not carry blocks.
pub const DEFAULT_MAX_PROTOCOL_MESSAGE_LENGTH: u64 = 2 * 1024 * 1024;

pub const DEFAULT_BLOCK_CARRYING_COMMANDS: [Command; 5] =
    [BLOCK, CMPCTBLOCK, BLOCKTXN, THINBLOCK, XTHINBLOCK];

/// Read-only view of the consensus state the size cap depends on, taken at
/// the moment bytes are handed to the deframer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusSnapshot {
    /// Maximum block size at the current chain tip, in bytes.
    pub max_block_size: u64,
}

impl ConsensusSnapshot {
    pub fn new(max_block_size: u64) -> Self {
        Self { max_block_size }
    }
}

/// The largest block the chain may accept once its current maximum block
/// size is raised as far as the consensus rules allow. Implementations must
/// be non-decreasing in `current_max_block_size`.
pub trait NextRaiseCap: Debug + Send + Sync {
    fn next_raise_cap(&self, current_max_block_size: u64) -> u64;
}

/// Lets the limit grow by a fixed ratio per adjustment period, 5% by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProportionalRaiseCap {
    numerator: u64,
    denominator: u64,
}

impl ProportionalRaiseCap {
    /// Returns `None` for a zero denominator or a ratio below one.
    pub fn new(numerator: u64, denominator: u64) -> Option<Self> {
        (denominator != 0 && numerator >= denominator).then_some(Self {
            numerator,
            denominator,
        })
    }
}

impl Default for ProportionalRaiseCap {
    fn default() -> Self {
        Self {
            numerator: 105,
            denominator: 100,
        }
    }
}

impl NextRaiseCap for ProportionalRaiseCap {
    fn next_raise_cap(&self, current_max_block_size: u64) -> u64 {
        let raised = u128::from(current_max_block_size) * u128::from(self.numerator)
            / u128::from(self.denominator);
        u64::try_from(raised).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Clone)]
pub struct SizeCapPolicy {
    max_message_size: u64,
    block_carrying: HashSet<Command>,
    raise_cap: Arc<dyn NextRaiseCap>,
}

impl SizeCapPolicy {
    pub fn new(
        max_message_size: u64,
        block_carrying: impl IntoIterator<Item = Command>,
        raise_cap: Arc<dyn NextRaiseCap>,
    ) -> Self {
        Self {
            max_message_size,
            block_carrying: block_carrying.into_iter().collect(),
            raise_cap,
        }
    }

    pub fn is_block_carrying(&self, command: &Command) -> bool {
        self.block_carrying.contains(command)
    }

    /// Maximum admissible total message size, header included.
    pub fn max_allowed_size(&self, command: &Command, consensus: ConsensusSnapshot) -> u64 {
        if self.is_block_carrying(command) {
            self.raise_cap.next_raise_cap(consensus.max_block_size)
        } else {
            self.max_message_size
        }
    }

    /// Reject a header that declares a message above the cap for its command.
    pub fn check(
        &self,
        header: &MessageHeader,
        consensus: ConsensusSnapshot,
    ) -> Result<(), FramingError> {
        let max = self.max_allowed_size(&header.command, consensus);
        let size = header.total_size();
        if size > max {
            return Err(FramingError::MessageTooLarge {
                command: header.command,
                size,
                max,
            });
        }
        Ok(())
    }
}

impl Default for SizeCapPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_PROTOCOL_MESSAGE_LENGTH,
            DEFAULT_BLOCK_CARRYING_COMMANDS,
            Arc::new(ProportionalRaiseCap::default()),
        )
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use proptest::prop_assert;
    use test_strategy::proptest;

    use super::*;
    use crate::config_models::network::Network;
    use crate::p2p::protocol::command::PING;
    use crate::p2p::protocol::command::TX;
    use crate::p2p::protocol::header::HEADER_SIZE;

    #[test]
    fn block_cap_tracks_consensus_block_size() {
        let policy = SizeCapPolicy::default();
        let small = ConsensusSnapshot::new(1_000_000);
        let large = ConsensusSnapshot::new(8_000_000);

        assert_eq!(1_050_000, policy.max_allowed_size(&BLOCK, small));
        assert_eq!(8_400_000, policy.max_allowed_size(&BLOCK, large));
        assert_eq!(
            DEFAULT_MAX_PROTOCOL_MESSAGE_LENGTH,
            policy.max_allowed_size(&TX, large)
        );
    }

    #[test]
    fn check_accepts_exactly_the_cap() {
        let policy = SizeCapPolicy::new(64, Vec::new(), Arc::new(ProportionalRaiseCap::default()));
        let consensus = ConsensusSnapshot::new(0);
        let mut header = MessageHeader::new(Network::Main, PING, &[]).unwrap();

        header.payload_length = 64 - HEADER_SIZE as u32;
        assert!(policy.check(&header, consensus).is_ok());

        header.payload_length += 1;
        let err = policy.check(&header, consensus).unwrap_err();
        assert!(matches!(
            err,
            FramingError::MessageTooLarge { size: 65, max: 64, .. }
        ));
    }

    #[test]
    fn max_payload_length_does_not_overflow() {
        let policy = SizeCapPolicy::default();
        let mut header = MessageHeader::new(Network::Main, BLOCK, &[]).unwrap();
        header.payload_length = u32::MAX;
        assert!(policy
            .check(&header, ConsensusSnapshot::new(u64::MAX))
            .is_ok());
        assert!(policy.check(&header, ConsensusSnapshot::new(1)).is_err());
    }

    #[test]
    fn ratio_below_one_is_refused() {
        assert!(ProportionalRaiseCap::new(99, 100).is_none());
        assert!(ProportionalRaiseCap::new(1, 0).is_none());
        assert!(ProportionalRaiseCap::new(2, 1).is_some());
    }

    #[proptest]
    fn raise_cap_is_monotonic(a: u64, b: u64) {
        let raise_cap = ProportionalRaiseCap::default();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(raise_cap.next_raise_cap(low) <= raise_cap.next_raise_cap(high));
        prop_assert!(raise_cap.next_raise_cap(low) >= low);
    }
}
