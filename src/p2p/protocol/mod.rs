//! Wire protocol definitions
//!
//! The message header layout, commands, checksum, the size cap and the
//! payload shape table.

pub mod checksum;
pub mod command;
pub mod header;
pub mod message;
pub mod policy;
pub mod size_cap;
pub mod validation;

pub use command::Command;
pub use header::MessageHeader;
pub use message::NetMessage;
pub use policy::InboundPolicy;
pub use size_cap::ConsensusSnapshot;
pub use size_cap::NextRaiseCap;
pub use size_cap::SizeCapPolicy;
pub use validation::PayloadShapeValidator;
pub use validation::SizeRule;
