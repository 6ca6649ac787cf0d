//! Ethereum header assembly from source-chain header fields and block totals.

use alloy::consensus::EMPTY_OMMER_ROOT_HASH;
use alloy::primitives::{Address, B256, B64, U256};
use recon_data::{hex, JsonRpcHeader, SourceHeader};

use crate::config::ChainParams;
use crate::error::BlockError;
use crate::format::BlockRef;
use crate::receipt::BlockTotals;

/// Validated source header with chain defaults applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockContext {
    pub number: u64,
    pub hash: B256,
    pub parent_hash: B256,
    pub timestamp: u64,
    pub miner: Address,
    pub gas_limit: u64,
    pub base_fee_per_gas: U256,
    pub state_root: B256,
}

impl BlockContext {
    /// # Errors
    /// `IncompleteSourceHeader` naming the first absent required field.
    pub fn from_header(header: &SourceHeader, chain: &ChainParams) -> Result<Self, BlockError> {
        let number = header
            .number
            .ok_or(BlockError::IncompleteSourceHeader("number"))?;
        let hash = header.hash.ok_or(BlockError::IncompleteSourceHeader("hash"))?;
        let parent_hash = header
            .parent_hash
            .ok_or(BlockError::IncompleteSourceHeader("parentHash"))?;
        let timestamp = header
            .timestamp
            .ok_or(BlockError::IncompleteSourceHeader("timestamp"))?;

        // Low 20 bytes of the sequencer felt.
        let miner = header
            .sequencer_address
            .map(|felt| Address::from_word(B256::from(felt)))
            .unwrap_or_default();

        Ok(Self {
            number,
            hash,
            parent_hash,
            timestamp,
            miner,
            gas_limit: header.gas_limit.unwrap_or(chain.block_gas_limit),
            base_fee_per_gas: header.base_fee_per_gas.unwrap_or(chain.base_fee_per_gas),
            state_root: header.state_root.map(B256::from).unwrap_or_default(),
        })
    }

    pub fn block_ref(&self) -> BlockRef {
        BlockRef {
            number: self.number,
            hash: self.hash,
        }
    }
}

/// Combines the block context with the folded totals.
pub fn assemble_header(ctx: &BlockContext, totals: &BlockTotals) -> JsonRpcHeader {
    JsonRpcHeader {
        number: hex::quantity(ctx.number),
        hash: hex::hash(&ctx.hash),
        parent_hash: hex::hash(&ctx.parent_hash),
        nonce: hex::bytes(B64::ZERO.as_slice()),
        sha3_uncles: hex::hash(&EMPTY_OMMER_ROOT_HASH),
        logs_bloom: hex::bloom(&totals.logs_bloom),
        transactions_root: hex::hash(&totals.transactions_root),
        state_root: hex::hash(&ctx.state_root),
        receipts_root: hex::hash(&totals.receipts_root),
        miner: hex::address(&ctx.miner),
        difficulty: hex::word(U256::ZERO),
        extra_data: hex::bytes(&[]),
        gas_limit: hex::quantity(ctx.gas_limit),
        gas_used: hex::quantity(totals.gas_used),
        timestamp: hex::quantity(ctx.timestamp),
        base_fee_per_gas: hex::word(ctx.base_fee_per_gas),
        mix_hash: hex::hash(&B256::ZERO),
        transaction_count: hex::quantity(totals.transaction_count),
    }
}
