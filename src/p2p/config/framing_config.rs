//! Configuration of the size cap, block-carrying commands and the optional
//! penalties for framing failures.

use serde::Deserialize;
use serde::Serialize;

use crate::config_models::cli_args;
use crate::config_models::network::Network;
use crate::p2p::protocol::command::Command;
use crate::p2p::protocol::header::HEADER_SIZE;
use crate::p2p::protocol::size_cap::DEFAULT_BLOCK_CARRYING_COMMANDS;
use crate::p2p::protocol::size_cap::DEFAULT_MAX_PROTOCOL_MESSAGE_LENGTH;

/// Default misbehavior score at which a peer should be disconnected.
pub const DEFAULT_PEER_TOLERANCE: u32 = 100;

/// Penalties for failures that are not payload shape violations. `None`
/// means the failure costs the peer nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MisbehaviorPolicy {
    /// Charged for every message dropped on a checksum mismatch.
    pub checksum_failure_penalty: Option<u32>,

    /// Charged when a feed fails on a malformed header or an oversized
    /// message.
    pub framing_violation_penalty: Option<u32>,
}

/// Configuration of the inbound framing layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramingConfig {
    /// Network whose magic every header must carry
    pub network: Network,

    /// Largest total message size, header included, for commands that do
    /// not carry blocks
    pub max_message_size: u64,

    /// Commands capped by the consensus block size
    pub block_carrying_commands: Vec<String>,

    pub misbehavior: MisbehaviorPolicy,

    /// Misbehavior score at which a peer should be disconnected
    pub peer_tolerance: u32,
}

impl FramingConfig {
    /// Create framing configuration from CLI arguments
    pub fn from_cli_args(cli_args: &cli_args::Args) -> Self {
        let block_carrying_commands = if cli_args.block_commands.is_empty() {
            Self::default().block_carrying_commands
        } else {
            cli_args.block_commands.clone()
        };

        Self {
            network: cli_args.network,
            max_message_size: cli_args.max_message_size.as_u64(),
            block_carrying_commands,
            misbehavior: MisbehaviorPolicy {
                checksum_failure_penalty: cli_args.checksum_failure_penalty,
                framing_violation_penalty: cli_args.framing_violation_penalty,
            },
            peer_tolerance: cli_args.peer_tolerance,
        }
    }

    /// Validate the framing configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_message_size < HEADER_SIZE as u64 {
            return Err(format!(
                "max_message_size must be at least the header size of {HEADER_SIZE} bytes"
            ));
        }

        if self.peer_tolerance == 0 {
            return Err("peer_tolerance must be greater than 0".to_string());
        }

        self.block_carrying_commands()?;
        Ok(())
    }

    /// The block-carrying commands, parsed.
    pub fn block_carrying_commands(&self) -> Result<Vec<Command>, String> {
        self.block_carrying_commands
            .iter()
            .map(|name| {
                Command::new(name).map_err(|e| format!("invalid block-carrying command: {e}"))
            })
            .collect()
    }
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            max_message_size: DEFAULT_MAX_PROTOCOL_MESSAGE_LENGTH,
            block_carrying_commands: DEFAULT_BLOCK_CARRYING_COMMANDS
                .iter()
                .map(|command| command.to_string())
                .collect(),
            misbehavior: MisbehaviorPolicy::default(),
            peer_tolerance: DEFAULT_PEER_TOLERANCE,
        }
    }
}
