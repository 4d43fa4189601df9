//! Inbound message framing for peer connections
//!
//! Bytes received from a peer flow through a [`StreamDeframer`] guarded by
//! the [`SizeCapPolicy`], complete messages are checked by the
//! [`PayloadShapeValidator`], and violations are scored in the
//! [`MisbehaviorLedger`]. Deciding whether to ban or disconnect a peer is
//! left to the caller.
//!
//! [`StreamDeframer`]: transport::StreamDeframer
//! [`SizeCapPolicy`]: protocol::SizeCapPolicy
//! [`PayloadShapeValidator`]: protocol::PayloadShapeValidator

pub mod config;
pub mod error;
pub mod peer;
pub mod protocol;
pub mod transport;

pub use config::FramingConfig;
pub use error::FeedError;
pub use error::FramingError;
pub use peer::MisbehaviorLedger;
pub use peer::PeerConnection;
pub use protocol::ConsensusSnapshot;
pub use protocol::NetMessage;
pub use transport::FeedOutcome;
