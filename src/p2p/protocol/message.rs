use bytes::BufMut;
use bytes::Bytes;

use super::command::Command;
use super::header::MessageHeader;
use super::header::HEADER_SIZE;
use crate::config_models::network::Network;
use crate::p2p::error::HeaderError;

/// A complete message whose checksum matched its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetMessage {
    header: MessageHeader,
    payload: Bytes,
}

impl NetMessage {
    pub fn new(
        network: Network,
        command: Command,
        payload: impl Into<Bytes>,
    ) -> Result<Self, HeaderError> {
        let payload = payload.into();
        let header = MessageHeader::new(network, command, &payload)?;
        Ok(Self { header, payload })
    }

    pub(crate) fn from_parts(header: MessageHeader, payload: Bytes) -> Self {
        Self { header, payload }
    }

    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    pub fn command(&self) -> Command {
        self.header.command
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload length as declared in the header, which equals the length of
    /// the buffered payload.
    pub fn payload_length(&self) -> u32 {
        self.header.payload_length
    }

    pub fn total_size(&self) -> u64 {
        self.header.total_size()
    }

    pub fn write_to<B: BufMut>(&self, dst: &mut B) {
        self.header.write_to(dst);
        dst.put_slice(&self.payload);
    }

    /// The message as it appears on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        self.write_to(&mut frame);
        frame
    }
}
