//! Pipeline configuration.
//!
//! Built by the caller (the CLI, or a test) and handed to
//! [`crate::pipeline::BlockPipeline::new`]; nothing in this crate reads the
//! process environment.

use alloy::primitives::U256;

/// Header gas limit used when the source header carries none.
pub const DEFAULT_BLOCK_GAS_LIMIT: u64 = 7_000_000;

/// Upper bound on concurrently running decode tasks.
pub const DEFAULT_MAX_CONCURRENT_DECODES: usize = 16;

/// Chain-level constants that the source header may not carry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainParams {
    pub block_gas_limit: u64,
    pub base_fee_per_gas: U256,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            block_gas_limit: DEFAULT_BLOCK_GAS_LIMIT,
            base_fee_per_gas: U256::ZERO,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    pub chain: ChainParams,
    /// Treat an invocation without a transaction index as block-fatal instead
    /// of placing it at index 0.
    pub require_transaction_index: bool,
    pub max_concurrent_decodes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chain: ChainParams::default(),
            require_transaction_index: false,
            max_concurrent_decodes: DEFAULT_MAX_CONCURRENT_DECODES,
        }
    }
}

impl PipelineConfig {
    pub fn with_require_transaction_index(mut self, require: bool) -> Self {
        self.require_transaction_index = require;
        self
    }

    /// Sets the decode fan-out bound; zero is raised to one.
    pub fn with_max_concurrent_decodes(mut self, max: usize) -> Self {
        self.max_concurrent_decodes = max.max(1);
        self
    }

    pub fn with_chain(mut self, chain: ChainParams) -> Self {
        self.chain = chain;
        self
    }
}
