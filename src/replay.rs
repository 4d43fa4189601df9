//! Replay of a capture of raw inbound peer bytes.
//!
//! Feeds the capture to a [`PeerConnection`] in fixed-size chunks, exactly as
//! a socket read loop would, and summarizes the result.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use anyhow::anyhow;
use anyhow::Context;
use anyhow::Result;
use itertools::Itertools;
use serde::Serialize;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config_models::cli_args::Args;
use crate::config_models::network::Network;
use crate::p2p::config::FramingConfig;
use crate::p2p::peer::MisbehaviorLedger;
use crate::p2p::peer::MisbehaviorReason;
use crate::p2p::peer::PeerConnection;
use crate::p2p::protocol::ConsensusSnapshot;
use crate::p2p::protocol::InboundPolicy;

const REPLAY_PEER_ID: u64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub network: Network,
    pub bytes_read: u64,
    pub delivered: usize,
    pub delivered_by_command: BTreeMap<String, usize>,
    pub checksum_failures: usize,

    /// Set when the replay stopped on a malformed header or oversized
    /// message.
    pub framing_error: Option<String>,

    pub score: u32,
    pub reasons: Vec<MisbehaviorReason>,
    pub would_disconnect: bool,
}

impl Display for ReplaySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "network: {}", self.network)?;
        writeln!(f, "bytes read: {}", self.bytes_read)?;
        writeln!(
            f,
            "messages delivered: {} ({})",
            self.delivered,
            self.delivered_by_command
                .iter()
                .map(|(command, count)| format!("{command}: {count}"))
                .join(", ")
        )?;
        writeln!(f, "checksum failures: {}", self.checksum_failures)?;
        if let Some(error) = &self.framing_error {
            writeln!(f, "stopped on framing error: {error}")?;
        }
        writeln!(f, "misbehavior score: {}", self.score)?;
        if !self.reasons.is_empty() {
            writeln!(f, "reasons: {}", self.reasons.iter().join("; "))?;
        }
        write!(f, "would disconnect: {}", self.would_disconnect)
    }
}

/// Replay the capture named in `args`.
pub async fn replay(args: &Args) -> Result<ReplaySummary> {
    let config = FramingConfig::from_cli_args(args);
    let policy = InboundPolicy::from_config(&config).map_err(|e| anyhow!(e))?;
    let consensus = ConsensusSnapshot::new(
        args.max_block_size
            .unwrap_or_else(|| config.network.genesis_max_block_size()),
    );

    let ledger = MisbehaviorLedger::new();
    let standing = ledger.register(REPLAY_PEER_ID);
    let mut connection = PeerConnection::new(REPLAY_PEER_ID, Arc::new(policy), standing.clone());

    let mut file = File::open(&args.capture)
        .await
        .with_context(|| format!("Failed to open capture {}", args.capture.display()))?;
    info!(
        "Replaying {} on {} in chunks of {} bytes",
        args.capture.display(),
        config.network,
        args.chunk_size
    );

    let mut buffer = vec![0u8; args.chunk_size];
    let mut bytes_read = 0u64;
    let mut delivered_by_command = BTreeMap::<String, usize>::new();
    let mut checksum_failures = 0;
    let mut framing_error = None;

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .context("Failed to read capture")?;
        if n == 0 {
            break;
        }
        bytes_read += n as u64;

        let result = connection.feed(&buffer[..n], consensus);
        for message in connection.drain() {
            debug!(
                "Delivered {} ({} byte payload)",
                message.command(),
                message.payload_length()
            );
            *delivered_by_command
                .entry(message.command().to_string())
                .or_default() += 1;
        }

        match result {
            Ok(outcome) => checksum_failures += outcome.checksum_failures,
            Err(rejected) => {
                checksum_failures += rejected.outcome.checksum_failures;
                warn!("Replay stopped after {bytes_read} bytes: {rejected}");
                framing_error = Some(rejected.error.to_string());
                break;
            }
        }
    }

    if framing_error.is_none() {
        if let Some(in_flight) = connection.in_flight() {
            info!(
                "Capture ends inside a message: {} header bytes, {} payload bytes",
                in_flight.header_bytes_read(),
                in_flight.payload_bytes_read()
            );
        }
    }

    Ok(ReplaySummary {
        network: config.network,
        bytes_read,
        delivered: delivered_by_command.values().sum(),
        delivered_by_command,
        checksum_failures,
        framing_error,
        score: standing.score(),
        reasons: standing.reasons().into_iter().collect(),
        would_disconnect: standing.has_reached(config.peer_tolerance),
    })
}
