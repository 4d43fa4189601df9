//! Framing configuration
//!
//! Settings for the inbound framing layer and their extraction from CLI
//! arguments.

pub mod framing_config;

pub use framing_config::FramingConfig;
pub use framing_config::MisbehaviorPolicy;
