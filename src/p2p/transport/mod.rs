//! Transport layer of the framing module
//!
//! Splitting raw inbound bytes into messages, either through explicit
//! [`StreamDeframer::feed`] calls or through the [`NetMessageCodec`] on a
//! `FramedRead`.

pub mod codec;
pub mod framing;

pub use codec::NetMessageCodec;
pub use framing::Completion;
pub use framing::FeedOutcome;
pub use framing::StreamDeframer;
