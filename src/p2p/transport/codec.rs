//! `tokio_util` codec for reading messages through `FramedRead`.
//!
//! Applies the same header validation, size cap and checksum rules as
//! [`StreamDeframer`](super::framing::StreamDeframer), for connections whose
//! socket is driven by a `Framed` stream instead of explicit `feed` calls.

use std::sync::Arc;

use bytes::Buf;
use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tokio_util::codec::Encoder;
use tracing::warn;

use super::framing::PAYLOAD_RESERVE_STEP;
use crate::config_models::network::Network;
use crate::p2p::error::FramingError;
use crate::p2p::protocol::header::MessageHeader;
use crate::p2p::protocol::header::HEADER_SIZE;
use crate::p2p::protocol::message::NetMessage;
use crate::p2p::protocol::size_cap::ConsensusSnapshot;
use crate::p2p::protocol::size_cap::SizeCapPolicy;

#[derive(Debug, Clone)]
pub struct NetMessageCodec {
    network: Network,
    size_cap: Arc<SizeCapPolicy>,
    consensus: ConsensusSnapshot,

    /// Header of the message whose payload is still arriving.
    current: Option<MessageHeader>,
    checksum_failures: u64,
}

impl NetMessageCodec {
    pub fn new(
        network: Network,
        size_cap: Arc<SizeCapPolicy>,
        consensus: ConsensusSnapshot,
    ) -> Self {
        Self {
            network,
            size_cap,
            consensus,
            current: None,
            checksum_failures: 0,
        }
    }

    /// Update the consensus state used for the size cap of headers decoded
    /// from now on.
    pub fn set_consensus(&mut self, consensus: ConsensusSnapshot) {
        self.consensus = consensus;
    }

    /// Number of messages dropped for a checksum mismatch.
    pub fn checksum_failures(&self) -> u64 {
        self.checksum_failures
    }

    fn decode_header(&mut self, src: &mut BytesMut) -> Result<Option<MessageHeader>, FramingError> {
        if let Some(header) = self.current {
            return Ok(Some(header));
        }
        if src.len() < HEADER_SIZE {
            src.reserve(HEADER_SIZE - src.len());
            return Ok(None);
        }

        let mut raw = [0u8; HEADER_SIZE];
        raw.copy_from_slice(&src[..HEADER_SIZE]);
        let header = MessageHeader::parse(&raw, self.network)?;
        self.size_cap.check(&header, self.consensus)?;

        src.advance(HEADER_SIZE);
        self.current = Some(header);
        Ok(Some(header))
    }
}

impl Decoder for NetMessageCodec {
    type Item = NetMessage;
    type Error = FramingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<NetMessage>, FramingError> {
        loop {
            let Some(header) = self.decode_header(src)? else {
                return Ok(None);
            };

            let payload_length = usize::try_from(header.payload_length).unwrap_or(usize::MAX);
            if src.len() < payload_length {
                src.reserve((payload_length - src.len()).min(PAYLOAD_RESERVE_STEP));
                return Ok(None);
            }

            self.current = None;
            let payload = src.split_to(payload_length).freeze();
            if header.checksum_matches(&payload) {
                return Ok(Some(NetMessage::from_parts(header, payload)));
            }

            warn!(
                "Dropping {} message with {} byte payload: checksum mismatch",
                header.command, header.payload_length
            );
            self.checksum_failures += 1;
        }
    }
}

impl Encoder<NetMessage> for NetMessageCodec {
    type Error = FramingError;

    fn encode(&mut self, item: NetMessage, dst: &mut BytesMut) -> Result<(), FramingError> {
        dst.reserve(HEADER_SIZE + item.payload().len());
        item.write_to(dst);
        Ok(())
    }
}
