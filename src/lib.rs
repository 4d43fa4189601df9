//! Inbound message framing, size capping and misbehavior scoring for a
//! peer-to-peer blockchain node.

// enables nightly feature coverage_attribute only for the `cargo +nightly llvm-cov` build.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config_models;
pub mod p2p;
pub mod replay;
