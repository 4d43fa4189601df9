use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use strum::EnumIter;

/// Size in bytes of the network magic that prefixes every message header.
pub const MAGIC_SIZE: usize = 4;

#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default, EnumIter, strum::EnumIs,
)]
#[non_exhaustive]
pub enum Network {
    /// Main net.
    #[default]
    Main,

    /// Public test network. Shares the wire format with main net but uses a
    /// distinct magic so that nodes of the two networks never interpret each
    /// other's messages.
    Testnet,

    /// Network for individual unit and integration tests.
    RegTest,
}

impl Network {
    /// The bytes every message header on this network starts with, in wire
    /// order.
    ///
    /// - main:    `F9 BE B4 D9`
    /// - testnet: `0B 11 09 07`
    /// - regtest: `FA BF B5 DA`
    pub fn magic(&self) -> [u8; MAGIC_SIZE] {
        match *self {
            Self::Main => [0xf9, 0xbe, 0xb4, 0xd9],
            Self::Testnet => [0x0b, 0x11, 0x09, 0x07],
            Self::RegTest => [0xfa, 0xbf, 0xb5, 0xda],
        }
    }

    /// Maximum block size at genesis, in bytes. Used as the consensus
    /// snapshot when no chain state is available, e.g. when replaying a
    /// capture.
    pub fn genesis_max_block_size(&self) -> u64 {
        1_000_000
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            Network::Main => "main",
            Network::Testnet => "testnet",
            Network::RegTest => "regtest",
        };
        write!(f, "{}", string)
    }
}

impl FromStr for Network {
    type Err = String;
    fn from_str(input: &str) -> Result<Network, Self::Err> {
        match input {
            "main" => Ok(Network::Main),
            "testnet" => Ok(Network::Testnet),
            "regtest" => Ok(Network::RegTest),
            _ => Err(format!("Failed to parse {} as network", input)),
        }
    }
}
