mod common;

use std::sync::Arc;

use common::bare_header;
use common::end_message;
use common::logging;
use peer_framing::config_models::network::Network;
use peer_framing::p2p::peer::MisbehaviorLedger;
use peer_framing::p2p::peer::PeerConnection;
use peer_framing::p2p::protocol::command::BLOCK;
use peer_framing::p2p::protocol::command::PING;
use peer_framing::p2p::protocol::command::TX;
use peer_framing::p2p::protocol::command::VERACK;
use peer_framing::p2p::protocol::header::CHECKSUM_OFFSET;
use peer_framing::p2p::protocol::header::HEADER_SIZE;
use peer_framing::p2p::protocol::ConsensusSnapshot;
use peer_framing::p2p::protocol::InboundPolicy;
use peer_framing::p2p::FramingError;

const NODE_ID: u64 = 0;

fn consensus() -> ConsensusSnapshot {
    ConsensusSnapshot::new(Network::RegTest.genesis_max_block_size())
}

fn node(ledger: &MisbehaviorLedger) -> PeerConnection {
    let policy = InboundPolicy::new(Network::RegTest);
    PeerConnection::new(NODE_ID, Arc::new(policy), ledger.register(NODE_ID))
}

fn ping(nonce: u64) -> Vec<u8> {
    end_message(Network::RegTest, PING, &nonce.to_le_bytes())
}

/// test: a complete ping fed in one call is delivered with its nonce
#[test]
fn full_message_in_one_call() {
    logging::tracing_logger();
    let ledger = MisbehaviorLedger::new();
    let mut node = node(&ledger);

    let outcome = node.feed(&ping(11), consensus()).unwrap();
    assert!(outcome.became_complete);

    let received = node.drain().collect::<Vec<_>>();
    assert_eq!(1, received.len());
    assert_eq!(PING, received[0].command());
    assert_eq!(&11u64.to_le_bytes()[..], &received[0].payload()[..]);
    assert_eq!(Some(0), ledger.get_score(NODE_ID));
}

/// test: the same ping fed one byte at a time completes on the last byte
#[test]
fn full_message_one_byte_at_a_time() {
    logging::tracing_logger();
    let ledger = MisbehaviorLedger::new();
    let mut node = node(&ledger);

    let bytes = ping(11);
    let (last, init) = bytes.split_last().unwrap();
    for byte in init {
        let outcome = node.feed(&[*byte], consensus()).unwrap();
        assert!(!outcome.became_complete);
    }
    let outcome = node.feed(&[*last], consensus()).unwrap();
    assert!(outcome.became_complete);

    let message = node.pop_received().unwrap();
    assert_eq!(&11u64.to_le_bytes()[..], &message.payload()[..]);
    assert!(node.pop_received().is_none());
}

/// test: a block one byte above the cap is refused, one exactly at the cap is
/// accepted by the same connection
///
/// scenario:
/// 1. compute the cap for the current consensus max block size
/// 2. feed a block whose header declares cap + 1 bytes in total
/// 3. feed a block of exactly cap bytes in total
#[test]
fn too_large_block() {
    logging::tracing_logger();
    let ledger = MisbehaviorLedger::new();
    let mut node = node(&ledger);
    let policy = InboundPolicy::new(Network::RegTest);
    let cap = policy.size_cap.max_allowed_size(&BLOCK, consensus());
    let max_payload = usize::try_from(cap).unwrap() - HEADER_SIZE;

    // the size cap fires on the header alone
    let oversized = bare_header(
        Network::RegTest,
        BLOCK,
        u32::try_from(max_payload + 1).unwrap(),
    );
    let rejected = node.feed(&oversized, consensus()).unwrap_err();
    assert!(matches!(
        rejected.error,
        FramingError::MessageTooLarge { size, max, .. } if size == cap + 1 && max == cap
    ));
    assert_eq!(0, node.received_len());
    assert!(node.in_flight().is_none());

    let block = end_message(Network::RegTest, BLOCK, &vec![0x42; max_payload]);
    assert_eq!(cap, block.len() as u64);
    let outcome = node.feed(&block, consensus()).unwrap();
    assert!(outcome.became_complete);
    assert_eq!(1, node.received_len());
    assert_eq!(Some(0), ledger.get_score(NODE_ID));
}

/// test: a message completed ahead of an oversized header in the same chunk
/// is reported alongside the rejection
#[test]
fn completion_before_rejection_is_reported() {
    logging::tracing_logger();
    let ledger = MisbehaviorLedger::new();
    let mut node = node(&ledger);

    let mut bytes = end_message(Network::RegTest, VERACK, &[]);
    bytes.extend(bare_header(Network::RegTest, TX, u32::MAX));
    let rejected = node.feed(&bytes, consensus()).unwrap_err();

    assert!(matches!(rejected.error, FramingError::MessageTooLarge { .. }));
    assert!(rejected.outcome.became_complete);
    assert_eq!(1, rejected.outcome.delivered);
    assert_eq!(Some(VERACK), node.pop_received().map(|m| m.command()));
    assert!(node.in_flight().is_none());
}

/// test: a verack carrying one byte is delivered but scored
#[test]
fn too_large_verack() {
    logging::tracing_logger();
    let ledger = MisbehaviorLedger::new();
    let mut node = node(&ledger);

    let outcome = node
        .feed(&end_message(Network::RegTest, VERACK, &[0]), consensus())
        .unwrap();

    assert!(outcome.became_complete);
    assert_eq!(1, node.received_len());
    assert!(ledger.get_score(NODE_ID).unwrap() > 0);
}

/// test: a ping with a 16-byte payload is delivered but scored
#[test]
fn too_large_ping() {
    logging::tracing_logger();
    let ledger = MisbehaviorLedger::new();
    let mut node = node(&ledger);

    let mut payload = 13u64.to_le_bytes().to_vec();
    payload.extend(13u64.to_le_bytes());
    let outcome = node
        .feed(&end_message(Network::RegTest, PING, &payload), consensus())
        .unwrap();

    assert!(outcome.became_complete);
    assert_eq!(16, node.pop_received().unwrap().payload().len());
    assert!(ledger.get_score(NODE_ID).unwrap() > 0);
}

/// test: a tampered payload is never delivered, the call is still accepted,
/// and the connection keeps working
#[test]
fn checksum_mismatch_is_dropped() {
    logging::tracing_logger();
    let ledger = MisbehaviorLedger::new();
    let mut node = node(&ledger);

    let mut bytes = ping(11);
    bytes[CHECKSUM_OFFSET + 1] ^= 0x80;
    let outcome = node.feed(&bytes, consensus()).unwrap();
    assert!(outcome.became_complete);
    assert_eq!(1, outcome.checksum_failures);
    assert_eq!(0, node.received_len());

    node.feed(&ping(12), consensus()).unwrap();
    assert_eq!(1, node.received_len());
}

/// test: a verack completes as soon as its header has arrived
#[test]
fn zero_length_verack_completes_with_header() {
    logging::tracing_logger();
    let ledger = MisbehaviorLedger::new();
    let mut node = node(&ledger);

    let bytes = end_message(Network::RegTest, VERACK, &[]);
    assert_eq!(HEADER_SIZE, bytes.len());
    assert!(!node.feed(&bytes[..HEADER_SIZE - 1], consensus()).unwrap().became_complete);
    assert!(node.feed(&bytes[HEADER_SIZE - 1..], consensus()).unwrap().became_complete);
    assert_eq!(Some(0), ledger.get_score(NODE_ID));
}

/// test: a stream of mixed messages yields the same messages whether fed at
/// once, byte by byte, or in uneven chunks
#[test]
fn chunking_invariance() {
    logging::tracing_logger();
    let mut bytes = end_message(Network::RegTest, VERACK, &[]);
    bytes.extend(ping(1));
    bytes.extend(end_message(Network::RegTest, BLOCK, &[7u8; 300]));
    bytes.extend(ping(2));

    let collect = |chunk_sizes: &[usize]| {
        let ledger = MisbehaviorLedger::new();
        let mut node = node(&ledger);
        let mut rest = bytes.as_slice();
        for size in chunk_sizes.iter().cycle() {
            if rest.is_empty() {
                break;
            }
            let (chunk, tail) = rest.split_at((*size).min(rest.len()));
            node.feed(chunk, consensus()).unwrap();
            rest = tail;
        }
        node.drain().collect::<Vec<_>>()
    };

    let whole = collect(&[bytes.len()]);
    assert_eq!(4, whole.len());
    assert_eq!(whole, collect(&[1]));
    assert_eq!(whole, collect(&[5, 23, 1, 100, 2]));
}
