//! The fixed 24-byte message header.
//!
//! ```text
//! offset 0   : magic           4 bytes, network-specific constant
//! offset 4   : command         12 bytes, ASCII, NUL-padded
//! offset 16  : payload length  4 bytes, little-endian unsigned integer
//! offset 20  : checksum        4 bytes, first 4 bytes of SHA256(SHA256(payload))
//! offset 24  : payload
//! ```

use bytes::BufMut;

use super::checksum::payload_checksum;
use super::command::Command;
use crate::config_models::network::Network;
use crate::config_models::network::MAGIC_SIZE;
use crate::p2p::error::HeaderError;

pub const COMMAND_OFFSET: usize = MAGIC_SIZE;
pub const COMMAND_SIZE: usize = 12;
pub const MESSAGE_SIZE_OFFSET: usize = COMMAND_OFFSET + COMMAND_SIZE;
pub const MESSAGE_SIZE_SIZE: usize = 4;
pub const CHECKSUM_OFFSET: usize = MESSAGE_SIZE_OFFSET + MESSAGE_SIZE_SIZE;
pub const CHECKSUM_SIZE: usize = 4;
pub const HEADER_SIZE: usize = CHECKSUM_OFFSET + CHECKSUM_SIZE;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageHeader {
    pub magic: [u8; MAGIC_SIZE],
    pub command: Command,
    pub payload_length: u32,
    pub checksum: [u8; CHECKSUM_SIZE],
}

impl MessageHeader {
    /// Header for `payload` sent as `command` on `network`.
    pub fn new(network: Network, command: Command, payload: &[u8]) -> Result<Self, HeaderError> {
        let payload_length =
            u32::try_from(payload.len()).map_err(|_| HeaderError::PayloadTooLong(payload.len()))?;
        Ok(Self {
            magic: network.magic(),
            command,
            payload_length,
            checksum: payload_checksum(payload),
        })
    }

    /// Parse a received header, rejecting foreign magic and malformed
    /// commands. Length and checksum are taken as declared.
    pub fn parse(raw: &[u8; HEADER_SIZE], network: Network) -> Result<Self, HeaderError> {
        let mut magic = [0u8; MAGIC_SIZE];
        magic.copy_from_slice(&raw[..MAGIC_SIZE]);
        if magic != network.magic() {
            return Err(HeaderError::InvalidMagic {
                expected: network.magic(),
                actual: magic,
            });
        }

        let mut command = [0u8; COMMAND_SIZE];
        command.copy_from_slice(&raw[COMMAND_OFFSET..MESSAGE_SIZE_OFFSET]);
        let command = Command::from_wire(command)?;

        let mut length = [0u8; MESSAGE_SIZE_SIZE];
        length.copy_from_slice(&raw[MESSAGE_SIZE_OFFSET..CHECKSUM_OFFSET]);

        let mut checksum = [0u8; CHECKSUM_SIZE];
        checksum.copy_from_slice(&raw[CHECKSUM_OFFSET..HEADER_SIZE]);

        Ok(Self {
            magic,
            command,
            payload_length: u32::from_le_bytes(length),
            checksum,
        })
    }

    pub fn write_to<B: BufMut>(&self, dst: &mut B) {
        dst.put_slice(&self.magic);
        dst.put_slice(self.command.as_bytes());
        dst.put_u32_le(self.payload_length);
        dst.put_slice(&self.checksum);
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut raw = [0u8; HEADER_SIZE];
        self.write_to(&mut &mut raw[..]);
        raw
    }

    /// Size of the whole message, header included.
    pub fn total_size(&self) -> u64 {
        HEADER_SIZE as u64 + u64::from(self.payload_length)
    }

    pub fn checksum_matches(&self, payload: &[u8]) -> bool {
        self.checksum == payload_checksum(payload)
    }

    /// Rewrite the length and checksum fields of a serialized frame so that
    /// they describe the bytes following the header. Magic and command are
    /// left untouched.
    pub fn seal(frame: &mut [u8]) -> Result<(), HeaderError> {
        if frame.len() < HEADER_SIZE {
            return Err(HeaderError::FrameTooShort(frame.len()));
        }

        let (header, payload) = frame.split_at_mut(HEADER_SIZE);
        let length =
            u32::try_from(payload.len()).map_err(|_| HeaderError::PayloadTooLong(payload.len()))?;
        header[MESSAGE_SIZE_OFFSET..CHECKSUM_OFFSET].copy_from_slice(&length.to_le_bytes());
        header[CHECKSUM_OFFSET..HEADER_SIZE].copy_from_slice(&payload_checksum(payload));
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::p2p::protocol::command::PING;
    use crate::p2p::protocol::command::VERACK;

    #[test]
    fn field_offsets_match_wire_layout() {
        assert_eq!(4, COMMAND_OFFSET);
        assert_eq!(16, MESSAGE_SIZE_OFFSET);
        assert_eq!(20, CHECKSUM_OFFSET);
        assert_eq!(24, HEADER_SIZE);
    }

    #[test]
    fn serialized_fields_land_at_their_offsets() {
        let payload = 11u64.to_le_bytes();
        let header = MessageHeader::new(Network::Main, PING, &payload).unwrap();
        let raw = header.to_bytes();

        assert_eq!(Network::Main.magic(), raw[..4]);
        assert_eq!(b"ping\0\0\0\0\0\0\0\0", &raw[4..16]);
        assert_eq!(8u32.to_le_bytes(), raw[16..20]);
        assert_eq!(payload_checksum(&payload), raw[20..24]);
        assert_eq!(header, MessageHeader::parse(&raw, Network::Main).unwrap());
    }

    #[test]
    fn parse_rejects_foreign_magic() {
        let raw = MessageHeader::new(Network::Testnet, VERACK, &[])
            .unwrap()
            .to_bytes();
        assert_eq!(
            Err(HeaderError::InvalidMagic {
                expected: Network::Main.magic(),
                actual: Network::Testnet.magic(),
            }),
            MessageHeader::parse(&raw, Network::Main)
        );
    }

    #[test]
    fn parse_rejects_malformed_command() {
        let mut raw = MessageHeader::new(Network::Main, VERACK, &[])
            .unwrap()
            .to_bytes();
        raw[COMMAND_OFFSET + 7] = b'x';
        assert!(matches!(
            MessageHeader::parse(&raw, Network::Main),
            Err(HeaderError::InvalidCommand(_))
        ));
    }

    #[test]
    fn seal_rewrites_length_and_checksum() {
        let header = MessageHeader::new(Network::Main, PING, &[]).unwrap();
        let mut frame = header.to_bytes().to_vec();
        frame.extend_from_slice(&7u64.to_le_bytes());
        MessageHeader::seal(&mut frame).unwrap();

        let mut raw = [0u8; HEADER_SIZE];
        raw.copy_from_slice(&frame[..HEADER_SIZE]);
        let sealed = MessageHeader::parse(&raw, Network::Main).unwrap();
        assert_eq!(8, sealed.payload_length);
        assert!(sealed.checksum_matches(&frame[HEADER_SIZE..]));
        assert_eq!(32, sealed.total_size());
    }

    #[test]
    fn seal_rejects_truncated_frame() {
        let mut frame = vec![0u8; HEADER_SIZE - 1];
        assert_eq!(
            Err(HeaderError::FrameTooShort(HEADER_SIZE - 1)),
            MessageHeader::seal(&mut frame)
        );
    }
}
