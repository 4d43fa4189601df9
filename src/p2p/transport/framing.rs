//! Incremental message framing
//!
//! Turns arbitrarily chunked inbound bytes into complete messages. The size
//! cap is checked once per message, as soon as its header is complete and
//! before any payload storage is allocated.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::config_models::network::Network;
use crate::p2p::error::FeedError;
use crate::p2p::error::FramingError;
use crate::p2p::protocol::header::MessageHeader;
use crate::p2p::protocol::header::HEADER_SIZE;
use crate::p2p::protocol::message::NetMessage;
use crate::p2p::protocol::size_cap::ConsensusSnapshot;
use crate::p2p::protocol::size_cap::SizeCapPolicy;

/// Upper bound on the payload storage reserved ahead of received bytes.
pub const PAYLOAD_RESERVE_STEP: usize = 256 * 1024;

/// The message currently being assembled on a connection.
#[derive(Debug, Clone)]
pub struct InFlightMessage {
    header_buf: [u8; HEADER_SIZE],
    header_bytes_read: usize,
    header: Option<MessageHeader>,
    payload: Vec<u8>,
}

impl InFlightMessage {
    fn new() -> Self {
        Self {
            header_buf: [0u8; HEADER_SIZE],
            header_bytes_read: 0,
            header: None,
            payload: Vec::new(),
        }
    }

    /// The parsed header, once all of it has arrived and passed the size cap.
    pub fn header(&self) -> Option<&MessageHeader> {
        self.header.as_ref()
    }

    pub fn header_bytes_read(&self) -> usize {
        self.header_bytes_read
    }

    pub fn payload_bytes_read(&self) -> usize {
        self.payload.len()
    }

    /// Bytes still missing from the payload. Zero while the header is
    /// incomplete.
    fn payload_bytes_missing(&self) -> usize {
        self.header.map_or(0, |header| {
            declared_length(&header).saturating_sub(self.payload.len())
        })
    }

    pub fn complete(&self) -> bool {
        self.header.is_some() && self.payload_bytes_missing() == 0
    }

    fn read_header(&mut self, bytes: &[u8]) -> usize {
        let n = (HEADER_SIZE - self.header_bytes_read).min(bytes.len());
        self.header_buf[self.header_bytes_read..self.header_bytes_read + n]
            .copy_from_slice(&bytes[..n]);
        self.header_bytes_read += n;
        n
    }

    fn start_payload(&mut self, header: MessageHeader) {
        self.payload = Vec::with_capacity(declared_length(&header).min(PAYLOAD_RESERVE_STEP));
        self.header = Some(header);
    }

    fn read_payload(&mut self, bytes: &[u8]) -> usize {
        let n = self.payload_bytes_missing().min(bytes.len());
        let len = self.payload.len();
        if n > self.payload.capacity() - len {
            let declared = self.header.map_or(len + n, |header| declared_length(&header));
            let target = (len + n)
                .max(self.payload.capacity().saturating_add(PAYLOAD_RESERVE_STEP))
                .min(declared);
            self.payload.reserve_exact(target - len);
        }
        self.payload.extend_from_slice(&bytes[..n]);
        n
    }

    fn finish(self) -> Option<Completion> {
        let header = self.header?;
        if header.checksum_matches(&self.payload) {
            let payload = Bytes::from(self.payload);
            Some(Completion::Delivered(NetMessage::from_parts(header, payload)))
        } else {
            Some(Completion::ChecksumMismatch(header))
        }
    }
}

fn declared_length(header: &MessageHeader) -> usize {
    // u32 always fits usize on supported targets
    usize::try_from(header.payload_length).unwrap_or(usize::MAX)
}

/// A message that reached its declared length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Delivered(NetMessage),

    /// Payload did not hash to the header checksum. The message is dropped.
    ChecksumMismatch(MessageHeader),
}

/// What a [`StreamDeframer::feed`] call completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedOutcome {
    /// At least one message reached its declared length, whether or not its
    /// checksum matched.
    pub became_complete: bool,

    pub delivered: usize,
    pub checksum_failures: usize,
}

#[derive(Debug, Clone)]
pub struct StreamDeframer {
    network: Network,
    size_cap: Arc<SizeCapPolicy>,
    in_flight: Option<InFlightMessage>,
}

impl StreamDeframer {
    pub fn new(network: Network, size_cap: Arc<SizeCapPolicy>) -> Self {
        Self {
            network,
            size_cap,
            in_flight: None,
        }
    }

    pub fn in_flight(&self) -> Option<&InFlightMessage> {
        self.in_flight.as_ref()
    }

    /// Consume `bytes`, handing every message that reaches its declared
    /// length to `on_complete` in arrival order.
    ///
    /// Fails on a malformed header or a message above the size cap. The
    /// partial message is discarded and the next call starts afresh. Messages
    /// completed earlier in the same call have already been handed on and
    /// are counted in the error's outcome.
    pub fn feed(
        &mut self,
        mut bytes: &[u8],
        consensus: ConsensusSnapshot,
        mut on_complete: impl FnMut(Completion),
    ) -> Result<FeedOutcome, FeedError> {
        trace!("Deframing {} bytes", bytes.len());
        let mut outcome = FeedOutcome::default();

        while !bytes.is_empty() {
            let consumed = match self.advance(bytes, consensus) {
                Ok(consumed) => consumed,
                Err(error) => {
                    self.in_flight = None;
                    return Err(FeedError { outcome, error });
                }
            };
            bytes = &bytes[consumed..];

            if !self.in_flight.as_ref().is_some_and(InFlightMessage::complete) {
                continue;
            }
            let Some(completion) = self.in_flight.take().and_then(InFlightMessage::finish) else {
                continue;
            };

            outcome.became_complete = true;
            match &completion {
                Completion::Delivered(message) => {
                    debug!(
                        "Received {} message with {} byte payload",
                        message.command(),
                        message.payload_length()
                    );
                    outcome.delivered += 1;
                }
                Completion::ChecksumMismatch(header) => {
                    warn!(
                        "Dropping {} message with {} byte payload: checksum mismatch",
                        header.command, header.payload_length
                    );
                    outcome.checksum_failures += 1;
                }
            }
            on_complete(completion);
        }

        Ok(outcome)
    }

    /// Move as many bytes as fit the current stage of the in-flight message.
    fn advance(
        &mut self,
        bytes: &[u8],
        consensus: ConsensusSnapshot,
    ) -> Result<usize, FramingError> {
        let message = self.in_flight.get_or_insert_with(InFlightMessage::new);
        if message.header.is_some() {
            return Ok(message.read_payload(bytes));
        }

        let consumed = message.read_header(bytes);
        if message.header_bytes_read == HEADER_SIZE {
            let header = MessageHeader::parse(&message.header_buf, self.network)?;
            self.size_cap.check(&header, consensus)?;
            trace!(
                "Header complete: {} with {} byte payload",
                header.command,
                header.payload_length
            );
            message.start_payload(header);
        }
        Ok(consumed)
    }
}
