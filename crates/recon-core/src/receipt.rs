//! Receipt construction and the per-block ordered fold.
//!
//! [`BlockAccumulator::apply`] must be called once per surviving transaction
//! in ascending transaction index: it advances the running gas total, ORs the
//! receipt bloom into the block bloom and inserts both trie leaves. Roots are
//! read once, by [`BlockAccumulator::finish`], which consumes the accumulator.

use alloy::consensus::{Eip658Value, Receipt, ReceiptEnvelope, ReceiptWithBloom};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Bloom, Log, B256, U256};
use recon_data::{hex, ExecutionOutcome, JsonRpcLog, JsonRpcReceipt};

use crate::bloom::BloomFilter;
use crate::error::BlockError;
use crate::format::TxRef;
use crate::rlp::encode_index;
use crate::transaction::{RecoveredTransaction, TypedTransaction};
use crate::trie::MerklePatriciaTrie;

/// Receipt produced for one transaction by the fold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedReceipt {
    pub envelope: ReceiptEnvelope,
    pub bloom: BloomFilter,
    pub gas_used: u64,
    pub cumulative_gas_used: u64,
}

impl AppliedReceipt {
    pub fn success(&self) -> bool {
        self.envelope.status()
    }
}

/// Block-level aggregates read after the last transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockTotals {
    pub transactions_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bloom,
    pub gas_used: u64,
    pub transaction_count: u64,
}

/// Builds the receipt envelope matching the variant of `tx`.
pub fn build_receipt(
    tx: &TypedTransaction,
    success: bool,
    cumulative_gas_used: u64,
    logs: &[Log],
) -> (ReceiptEnvelope, BloomFilter) {
    let bloom = BloomFilter::from_logs(logs);
    let receipt = ReceiptWithBloom {
        receipt: Receipt {
            status: Eip658Value::Eip658(success),
            cumulative_gas_used,
            logs: logs.to_vec(),
        },
        logs_bloom: bloom.into_inner(),
    };

    let envelope = match tx {
        TypedTransaction::Legacy(_) => ReceiptEnvelope::Legacy(receipt),
        TypedTransaction::AccessList(_) => ReceiptEnvelope::Eip2930(receipt),
        TypedTransaction::FeeMarket(_) => ReceiptEnvelope::Eip1559(receipt),
    };
    (envelope, bloom)
}

/// Mutable state of one block: running gas, block bloom and both tries.
#[derive(Debug, Default)]
pub struct BlockAccumulator {
    cumulative_gas_used: u64,
    block_bloom: BloomFilter,
    transaction_trie: MerklePatriciaTrie,
    receipt_trie: MerklePatriciaTrie,
}

impl BlockAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gas used by every transaction applied so far.
    pub fn cumulative_gas_used(&self) -> u64 {
        self.cumulative_gas_used
    }

    /// Applies the transaction at `index` with its filtered `logs`.
    ///
    /// # Errors
    /// - `DuplicateTransactionIndex` if `index` was already applied.
    /// - `GasOverflow` if the running total does not fit `u64`.
    pub fn apply(
        &mut self,
        index: u64,
        tx: &TypedTransaction,
        outcome: &ExecutionOutcome,
        logs: &[Log],
    ) -> Result<AppliedReceipt, BlockError> {
        let key = encode_index(index);
        if self.transaction_trie.get(&key).is_some() {
            return Err(BlockError::DuplicateTransactionIndex(index));
        }
        let cumulative_gas_used = self
            .cumulative_gas_used
            .checked_add(outcome.gas_used)
            .ok_or(BlockError::GasOverflow(index))?;

        let (envelope, bloom) = build_receipt(tx, outcome.success, cumulative_gas_used, logs);

        self.cumulative_gas_used = cumulative_gas_used;
        self.block_bloom.merge(&bloom);
        self.transaction_trie.put(key.clone(), tx.encoded_2718());
        self.receipt_trie.put(key, envelope.encoded_2718());

        Ok(AppliedReceipt {
            envelope,
            bloom,
            gas_used: outcome.gas_used,
            cumulative_gas_used,
        })
    }

    /// Computes both roots and the block bloom.
    pub fn finish(self) -> BlockTotals {
        BlockTotals {
            transactions_root: self.transaction_trie.root(),
            receipts_root: self.receipt_trie.root(),
            logs_bloom: self.block_bloom.into_inner(),
            gas_used: self.cumulative_gas_used,
            transaction_count: self.transaction_trie.len() as u64,
        }
    }
}

/// Price per gas actually paid, given the block base fee.
pub fn effective_gas_price(tx: &TypedTransaction, base_fee_per_gas: U256) -> U256 {
    match (tx.gas_price(), tx.max_fee_per_gas(), tx.max_priority_fee_per_gas()) {
        (Some(gas_price), _, _) => U256::from(gas_price),
        (None, Some(max_fee), Some(priority)) => {
            let tipped = base_fee_per_gas.saturating_add(U256::from(priority));
            tipped.min(U256::from(max_fee))
        }
        _ => U256::ZERO,
    }
}

/// Renders the JSON-RPC receipt of `recovered`.
pub fn format_receipt(
    recovered: &RecoveredTransaction,
    owner: &TxRef,
    applied: &AppliedReceipt,
    logs: Vec<JsonRpcLog>,
    base_fee_per_gas: U256,
) -> JsonRpcReceipt {
    let tx = &recovered.tx;
    JsonRpcReceipt {
        transaction_hash: hex::hash(&owner.transaction_hash),
        transaction_index: hex::quantity(owner.transaction_index),
        block_hash: hex::hash(&owner.block.hash),
        block_number: hex::quantity(owner.block.number),
        from: hex::address(&recovered.sender),
        to: tx.to().map(|to| hex::address(&to)),
        contract_address: recovered.contract_address().map(|a| hex::address(&a)),
        gas_used: hex::quantity(applied.gas_used),
        cumulative_gas_used: hex::quantity(applied.cumulative_gas_used),
        effective_gas_price: hex::word(effective_gas_price(tx, base_fee_per_gas)),
        logs,
        logs_bloom: hex::bloom(applied.bloom.as_bloom()),
        status: hex::quantity(u64::from(applied.success())),
        tx_type: hex::quantity(u64::from(tx.tx_type())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::consensus::proofs::calculate_receipt_root;
    use alloy::consensus::{SignableTransaction, TxEip1559, TxLegacy, EMPTY_ROOT_HASH};
    use alloy::primitives::{Address, Bytes, PrimitiveSignature, TxKind};

    fn legacy_tx(nonce: u64) -> TypedTransaction {
        let tx = TxLegacy {
            chain_id: Some(1),
            nonce,
            gas_price: 10,
            gas_limit: 21_000,
            to: TxKind::Call(Address::repeat_byte(0x44)),
            value: U256::ZERO,
            input: Bytes::new(),
        };
        let sig = PrimitiveSignature::new(U256::from(1u64), U256::from(1u64), false);
        TypedTransaction::Legacy(tx.into_signed(sig))
    }

    fn outcome(gas_used: u64, success: bool) -> ExecutionOutcome {
        ExecutionOutcome {
            success,
            gas_used,
            events: vec![],
        }
    }

    fn log(byte: u8) -> Log {
        Log::new(
            Address::repeat_byte(byte),
            vec![B256::repeat_byte(byte)],
            Bytes::new(),
        )
        .expect("one topic")
    }

    #[test]
    fn empty_block_has_empty_roots() {
        let totals = BlockAccumulator::new().finish();
        assert_eq!(totals.transactions_root, EMPTY_ROOT_HASH);
        assert_eq!(totals.receipts_root, EMPTY_ROOT_HASH);
        assert_eq!(totals.logs_bloom, Bloom::ZERO);
        assert_eq!(totals.gas_used, 0);
        assert_eq!(totals.transaction_count, 0);
    }

    #[test]
    fn cumulative_gas_follows_application_order() {
        let mut acc = BlockAccumulator::new();
        let first = acc
            .apply(0, &legacy_tx(0), &outcome(21_000, true), &[])
            .expect("index 0");
        let second = acc
            .apply(1, &legacy_tx(1), &outcome(50_000, false), &[log(1)])
            .expect("index 1");

        assert_eq!(first.cumulative_gas_used, 21_000);
        assert_eq!(second.cumulative_gas_used, 71_000);
        assert!(first.success());
        assert!(!second.success());
        assert_eq!(acc.cumulative_gas_used(), 71_000);
    }

    #[test]
    fn receipt_root_matches_reference() {
        let mut acc = BlockAccumulator::new();
        let mut envelopes = Vec::new();
        for i in 0..3u64 {
            let applied = acc
                .apply(i, &legacy_tx(i), &outcome(1_000 * (i + 1), true), &[log(i as u8)])
                .expect("unique index");
            envelopes.push(applied.envelope);
        }

        let totals = acc.finish();
        assert_eq!(totals.receipts_root, calculate_receipt_root(&envelopes));
        assert_eq!(totals.gas_used, 6_000);
        assert_eq!(totals.transaction_count, 3);
    }

    #[test]
    fn block_bloom_is_or_of_receipt_blooms() {
        let mut acc = BlockAccumulator::new();
        let a = acc
            .apply(0, &legacy_tx(0), &outcome(1, true), &[log(1)])
            .expect("index 0");
        let b = acc
            .apply(1, &legacy_tx(1), &outcome(1, true), &[log(2), log(3)])
            .expect("index 1");

        let mut expected = a.bloom;
        expected.merge(&b.bloom);
        assert_eq!(acc.finish().logs_bloom, expected.into_inner());
    }

    #[test]
    fn rejects_duplicate_index_and_overflow() {
        let mut acc = BlockAccumulator::new();
        acc.apply(5, &legacy_tx(0), &outcome(u64::MAX - 1, true), &[])
            .expect("first use of index 5");

        assert_eq!(
            acc.apply(5, &legacy_tx(1), &outcome(1, true), &[]),
            Err(BlockError::DuplicateTransactionIndex(5))
        );
        assert_eq!(
            acc.apply(6, &legacy_tx(1), &outcome(2, true), &[]),
            Err(BlockError::GasOverflow(6))
        );
        assert_eq!(acc.cumulative_gas_used(), u64::MAX - 1);
    }

    #[test]
    fn fee_market_effective_price_is_capped() {
        let tx = TxEip1559 {
            chain_id: 1,
            nonce: 0,
            gas_limit: 21_000,
            max_fee_per_gas: 100,
            max_priority_fee_per_gas: 10,
            to: TxKind::Create,
            value: U256::ZERO,
            access_list: Default::default(),
            input: Bytes::new(),
        };
        let sig = PrimitiveSignature::new(U256::from(1u64), U256::from(1u64), false);
        let typed = TypedTransaction::FeeMarket(tx.into_signed(sig));

        assert_eq!(effective_gas_price(&typed, U256::from(50u64)), U256::from(60u64));
        assert_eq!(effective_gas_price(&typed, U256::from(95u64)), U256::from(100u64));
        assert_eq!(effective_gas_price(&legacy_tx(0), U256::from(95u64)), U256::from(10u64));

        let (envelope, _) = build_receipt(&typed, true, 0, &[]);
        assert!(matches!(envelope, ReceiptEnvelope::Eip1559(_)));
        let (envelope, _) = build_receipt(&legacy_tx(0), false, 7, &[]);
        assert!(matches!(envelope, ReceiptEnvelope::Legacy(_)));
        assert!(!envelope.status());
    }
}
