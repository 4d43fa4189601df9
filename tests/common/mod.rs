pub mod logging;

use peer_framing::config_models::network::Network;
use peer_framing::p2p::protocol::header::MessageHeader;
use peer_framing::p2p::protocol::header::HEADER_SIZE;
use peer_framing::p2p::protocol::header::MESSAGE_SIZE_OFFSET;
use peer_framing::p2p::protocol::Command;

/// Serialize a message the way a remote peer would: header followed by
/// payload, with the length and checksum fields computed from the payload.
pub fn end_message(network: Network, command: Command, payload: &[u8]) -> Vec<u8> {
    let mut frame = MessageHeader::new(network, command, &[])
        .unwrap()
        .to_bytes()
        .to_vec();
    frame.extend_from_slice(payload);
    MessageHeader::seal(&mut frame).unwrap();
    frame
}

/// A header declaring `payload_length` bytes, without the payload.
#[allow(dead_code)]
pub fn bare_header(network: Network, command: Command, payload_length: u32) -> [u8; HEADER_SIZE] {
    let mut raw = MessageHeader::new(network, command, &[]).unwrap().to_bytes();
    raw[MESSAGE_SIZE_OFFSET..MESSAGE_SIZE_OFFSET + 4].copy_from_slice(&payload_length.to_le_bytes());
    raw
}
