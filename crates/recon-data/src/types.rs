//! Type definitions for source blocks and reconstructed JSON-RPC records.
//!
//! Input types mirror what the upstream event stream delivers for one block:
//! a source-chain header plus one [`RawInvocation`] per executed call. Output
//! types are the Ethereum JSON-RPC shapes written to the sink, with every
//! numeric field pre-rendered as fixed-width hex (see [`crate::hex`]).

use alloy::primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source-chain field element (up to 252 bits), carried as a 256-bit integer.
pub type Felt = U256;

/// One block as delivered by the upstream event stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBlock {
    /// Source-chain header.
    pub header: SourceHeader,
    /// Invocations in delivery order (not necessarily execution order).
    #[serde(default)]
    pub invocations: Vec<RawInvocation>,
}

/// Header fields reported by the source chain.
///
/// The first four fields are required to assemble an Ethereum header; they are
/// optional here so that an incomplete upstream record can be reported instead
/// of failing deserialization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceHeader {
    /// Block number.
    #[serde(default)]
    pub number: Option<u64>,
    /// Block hash.
    #[serde(default)]
    pub hash: Option<B256>,
    /// Parent block hash.
    #[serde(default)]
    pub parent_hash: Option<B256>,
    /// Timestamp in unix seconds.
    #[serde(default)]
    pub timestamp: Option<u64>,
    /// Sequencer address on the source chain; its low 20 bytes become `miner`.
    #[serde(default)]
    pub sequencer_address: Option<Felt>,
    /// Gas limit override.
    #[serde(default)]
    pub gas_limit: Option<u64>,
    /// Base fee override in Wei.
    #[serde(default)]
    pub base_fee_per_gas: Option<U256>,
    /// Source-chain state commitment.
    #[serde(default)]
    pub state_root: Option<Felt>,
}

/// One application-level call carrying an embedded Ethereum transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInvocation {
    /// Source-chain transaction hash, used for diagnostics only.
    #[serde(default)]
    pub transaction_hash: B256,
    /// Call array: call count, target, selector, data offset, data length,
    /// payload length, then one element per payload byte.
    pub calldata: Vec<Felt>,
    /// Signature limbs: r-low, r-high, s-low, s-high, v.
    pub signature: Vec<Felt>,
    /// Position in block execution order.
    #[serde(default)]
    pub transaction_index: Option<u64>,
    /// Execution result reported by the source chain.
    pub outcome: ExecutionOutcome,
}

/// Execution result of one invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    /// Whether the embedded transaction succeeded.
    pub success: bool,
    /// Gas consumed by the embedded transaction.
    pub gas_used: u64,
    /// Raw events in emission order.
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

/// Raw source-chain event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Event keys; `keys[0]` is the emitter or the event selector.
    pub keys: Vec<Felt>,
    /// Event payload.
    #[serde(default)]
    pub data: Vec<Felt>,
}

/// One access-list entry of a typed transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRpcAccessListItem {
    /// Accessed account.
    pub address: String,
    /// Accessed storage slots.
    pub storage_keys: Vec<String>,
}

/// Ethereum JSON-RPC transaction record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRpcTransaction {
    pub hash: String,
    pub nonce: String,
    pub block_hash: String,
    pub block_number: String,
    pub transaction_index: String,
    pub from: String,
    /// `None` for contract creation.
    pub to: Option<String>,
    pub value: String,
    pub gas: String,
    /// Legacy gas price, or `maxFeePerGas` for fee-market transactions.
    pub gas_price: String,
    pub input: String,
    pub v: String,
    pub r: String,
    pub s: String,
    #[serde(rename = "type")]
    pub tx_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_list: Option<Vec<JsonRpcAccessListItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_parity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_blob_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_versioned_hashes: Option<Vec<String>>,
}

/// Ethereum JSON-RPC log record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRpcLog {
    pub removed: bool,
    /// Position within the owning transaction's filtered logs.
    pub log_index: String,
    pub transaction_index: String,
    pub transaction_hash: String,
    pub block_hash: String,
    pub block_number: String,
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
}

/// Ethereum JSON-RPC receipt record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRpcReceipt {
    pub transaction_hash: String,
    pub transaction_index: String,
    pub block_hash: String,
    pub block_number: String,
    pub from: String,
    pub to: Option<String>,
    /// Set only for contract creation.
    pub contract_address: Option<String>,
    pub gas_used: String,
    pub cumulative_gas_used: String,
    pub effective_gas_price: String,
    pub logs: Vec<JsonRpcLog>,
    pub logs_bloom: String,
    pub status: String,
    #[serde(rename = "type")]
    pub tx_type: String,
}

/// Ethereum JSON-RPC block header record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRpcHeader {
    pub number: String,
    pub hash: String,
    pub parent_hash: String,
    pub nonce: String,
    pub sha3_uncles: String,
    pub logs_bloom: String,
    pub transactions_root: String,
    pub state_root: String,
    pub receipts_root: String,
    pub miner: String,
    pub difficulty: String,
    pub extra_data: String,
    pub gas_limit: String,
    pub gas_used: String,
    pub timestamp: String,
    pub base_fee_per_gas: String,
    pub mix_hash: String,
    pub transaction_count: String,
}

/// Record payload of a [`StoreItem`], tagged by target collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "collection", content = "data")]
pub enum StoreRecord {
    #[serde(rename = "header")]
    Header(JsonRpcHeader),
    #[serde(rename = "transactions")]
    Transaction(JsonRpcTransaction),
    #[serde(rename = "receipts")]
    Receipt(JsonRpcReceipt),
    #[serde(rename = "logs")]
    Log(JsonRpcLog),
}

impl StoreRecord {
    /// Sink collection name for this record.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Header(_) => "header",
            Self::Transaction(_) => "transactions",
            Self::Receipt(_) => "receipts",
            Self::Log(_) => "logs",
        }
    }
}

/// One output record plus its creation time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreItem {
    pub record: StoreRecord,
    pub created_at: DateTime<Utc>,
}

impl StoreItem {
    /// Wraps a record, stamping it with the current time.
    pub fn new(record: StoreRecord) -> Self {
        Self {
            record,
            created_at: Utc::now(),
        }
    }
}

/// Derives an EVM address from a source-chain felt, if it fits in 160 bits.
pub fn felt_to_address(felt: Felt) -> Option<Address> {
    if felt.bit_len() > 160 {
        return None;
    }
    Some(Address::from_word(B256::from(felt.to_be_bytes::<32>())))
}
