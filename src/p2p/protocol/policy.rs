use std::sync::Arc;

use super::size_cap::ProportionalRaiseCap;
use super::size_cap::SizeCapPolicy;
use super::validation::PayloadShapeValidator;
use crate::config_models::network::Network;
use crate::p2p::config::FramingConfig;
use crate::p2p::config::MisbehaviorPolicy;

/// Everything a connection needs to judge inbound bytes, shared by all
/// connections of a node.
#[derive(Debug, Clone)]
pub struct InboundPolicy {
    pub network: Network,
    pub size_cap: Arc<SizeCapPolicy>,
    pub validator: PayloadShapeValidator,
    pub misbehavior: MisbehaviorPolicy,
}

impl InboundPolicy {
    /// Default rules for `network`.
    pub fn new(network: Network) -> Self {
        Self {
            network,
            size_cap: Arc::new(SizeCapPolicy::default()),
            validator: PayloadShapeValidator::default(),
            misbehavior: MisbehaviorPolicy::default(),
        }
    }

    pub fn from_config(config: &FramingConfig) -> Result<Self, String> {
        config.validate()?;
        let size_cap = SizeCapPolicy::new(
            config.max_message_size,
            config.block_carrying_commands()?,
            Arc::new(ProportionalRaiseCap::default()),
        );

        Ok(Self {
            network: config.network,
            size_cap: Arc::new(size_cap),
            validator: PayloadShapeValidator::default(),
            misbehavior: config.misbehavior,
        })
    }

    pub fn with_misbehavior(mut self, misbehavior: MisbehaviorPolicy) -> Self {
        self.misbehavior = misbehavior;
        self
    }
}
