use std::path::PathBuf;

use bytesize::ByteSize;
use clap::builder::RangedI64ValueParser;
use clap::Parser;

use super::network::Network;

/// The `framing-replay` program feeds a capture of raw inbound peer bytes
/// through the message deframer and reports what a node would have done
/// with them.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
pub struct Args {
    /// File holding the raw bytes received from a single peer, in arrival
    /// order.
    #[clap(value_name = "FILE")]
    pub capture: PathBuf,

    /// Specify network, `main`, `testnet`, or `regtest`
    #[clap(long, short, default_value = "main")]
    pub network: Network,

    /// Number of bytes handed to the deframer per read.
    ///
    /// Use 1 to replay the capture a single byte at a time.
    #[clap(
        long,
        default_value = "4096",
        value_parser(RangedI64ValueParser::<usize>::new().range(1..=16_777_216))
    )]
    pub chunk_size: usize,

    /// Consensus maximum block size at the chain tip, in bytes.
    ///
    /// Defaults to the network's genesis value.
    #[clap(long, value_name = "BYTES")]
    pub max_block_size: Option<u64>,

    /// Largest message accepted for commands that do not carry blocks.
    ///
    /// Units: B (bytes), K (kilobytes), M (megabytes), MiB (mebibytes), ...
    ///
    /// E.g. --max-message-size 4MiB
    #[clap(long, default_value = "2MiB")]
    pub max_message_size: ByteSize,

    /// Command treated as block-carrying, i.e. capped by the consensus block
    /// size instead of --max-message-size. May be given more than once. When
    /// absent, the built-in set is used.
    #[clap(long = "block-command", value_name = "COMMAND")]
    pub block_commands: Vec<String>,

    /// Penalty added to the peer's misbehavior score for each message whose
    /// checksum does not match its payload. No penalty when absent.
    #[clap(long, value_name = "SCORE")]
    pub checksum_failure_penalty: Option<u32>,

    /// Penalty added to the peer's misbehavior score when a header is
    /// malformed or declares an oversized message. No penalty when absent.
    #[clap(long, value_name = "SCORE")]
    pub framing_violation_penalty: Option<u32>,

    /// Misbehavior score at which the summary reports the peer as one the
    /// node would disconnect.
    #[clap(
        long,
        default_value = "100",
        value_name = "SCORE",
        value_parser = clap::value_parser!(u32).range(1..),
    )]
    pub peer_tolerance: u32,

    /// Print the summary as JSON.
    #[clap(long)]
    pub json: bool,
}
