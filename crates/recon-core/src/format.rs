//! Signed transaction → JSON-RPC transaction record.

use alloy::primitives::B256;
use recon_data::types::JsonRpcAccessListItem;
use recon_data::{hex, JsonRpcTransaction};

use crate::error::{BlockError, DecodeError};
use crate::transaction::{RecoveredTransaction, TypedTransaction};

/// Block a record belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockRef {
    pub number: u64,
    pub hash: B256,
}

/// Position of the transaction that owns a receipt or log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxRef {
    pub block: BlockRef,
    pub transaction_index: u64,
    pub transaction_hash: B256,
}

/// Resolves the execution index reported for an invocation.
///
/// An absent index becomes 0 with a warning unless `required` is set.
pub fn resolve_transaction_index(
    reported: Option<u64>,
    source_hash: B256,
    required: bool,
) -> Result<u64, BlockError> {
    match reported {
        Some(index) => Ok(index),
        None if required => Err(BlockError::MissingTransactionIndex(source_hash)),
        None => {
            tracing::warn!(
                source_hash = %source_hash,
                "invocation has no transaction index, defaulting to 0"
            );
            Ok(0)
        }
    }
}

/// Maps a recovered transaction at `transaction_index` into its JSON-RPC
/// record.
///
/// # Errors
/// `UnsignedTransaction` if the attached signature has a zero `r` or `s`.
pub fn format_transaction(
    recovered: &RecoveredTransaction,
    block: &BlockRef,
    transaction_index: u64,
) -> Result<JsonRpcTransaction, DecodeError> {
    let tx = &recovered.tx;
    let signature = tx.signature();
    if signature.r().is_zero() || signature.s().is_zero() {
        return Err(DecodeError::UnsignedTransaction);
    }

    let gas_price = tx
        .gas_price()
        .or_else(|| tx.max_fee_per_gas())
        .unwrap_or_default();
    let y_parity = match tx {
        TypedTransaction::Legacy(_) => None,
        _ => Some(hex::quantity(signature.v() as u64)),
    };

    Ok(JsonRpcTransaction {
        hash: hex::hash(&tx.hash()),
        nonce: hex::quantity(tx.nonce()),
        block_hash: hex::hash(&block.hash),
        block_number: hex::quantity(block.number),
        transaction_index: hex::quantity(transaction_index),
        from: hex::address(&recovered.sender),
        to: tx.to().map(|to| hex::address(&to)),
        value: hex::word(tx.value()),
        gas: hex::quantity(tx.gas_limit()),
        gas_price: hex::word_u128(gas_price),
        input: hex::bytes(tx.input()),
        v: hex::quantity(tx.v()),
        r: hex::word(signature.r()),
        s: hex::word(signature.s()),
        tx_type: hex::quantity(u64::from(tx.tx_type())),
        chain_id: tx.chain_id().map(hex::quantity),
        max_fee_per_gas: tx.max_fee_per_gas().map(hex::word_u128),
        max_priority_fee_per_gas: tx.max_priority_fee_per_gas().map(hex::word_u128),
        access_list: tx.access_list().map(|list| {
            list.0
                .iter()
                .map(|item| JsonRpcAccessListItem {
                    address: hex::address(&item.address),
                    storage_keys: item.storage_keys.iter().map(hex::hash).collect(),
                })
                .collect()
        }),
        y_parity,
        max_fee_per_blob_gas: None,
        blob_versioned_hashes: None,
    })
}
