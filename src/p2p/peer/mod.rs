//! Peer-side state of the framing layer
//!
//! A [`PeerConnection`] per connected peer, and the shared
//! [`MisbehaviorLedger`] the connections report violations to.

pub mod connection;
pub mod ledger;
pub mod sanction;

pub use connection::PeerConnection;
pub use ledger::MisbehaviorLedger;
pub use ledger::PeerId;
pub use ledger::PeerStandingHandle;
pub use sanction::MisbehaviorReason;
