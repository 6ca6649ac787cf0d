//! Per-block orchestration.
//!
//! A block moves through four stages:
//!
//! 1. **Decoding**: every invocation is decoded, signed, recovered and
//!    formatted independently. [`BlockPipeline::process_block`] fans this out
//!    over a `JoinSet` of blocking tasks bounded by a semaphore.
//! 2. **Aggregating**: survivors get their transaction index resolved, are
//!    sorted by it and folded
//!    through one [`BlockAccumulator`] (gas, bloom, tries), emitting the
//!    transaction, receipt and log records of each.
//! 3. **Finalizing**: roots are computed and the header record is appended.
//! 4. **Done**.
//!
//! Decode failures drop the invocation and are reported in
//! [`BlockOutput::dropped`]. Block errors abort before anything is returned.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::{Bloom, Log, B256};
use recon_data::{
    ExecutionOutcome, JsonRpcHeader, JsonRpcTransaction, RawInvocation, SourceBlock, StoreItem,
    StoreRecord,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::calldata::decode_calldata;
use crate::config::PipelineConfig;
use crate::error::{BlockError, DecodeError, DroppedInvocation};
use crate::format::{format_transaction, resolve_transaction_index, BlockRef, TxRef};
use crate::header::{assemble_header, BlockContext};
use crate::logs::{format_logs, EventFilter};
use crate::receipt::{format_receipt, BlockAccumulator};
use crate::signature::RawSignature;
use crate::transaction::RecoveredTransaction;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Decoding,
    Aggregating,
    Finalizing,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decoding => write!(f, "decoding"),
            Self::Aggregating => write!(f, "aggregating"),
            Self::Finalizing => write!(f, "finalizing"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Everything produced for one block.
#[derive(Clone, Debug)]
pub struct BlockOutput {
    /// Transaction, receipt and log records per transaction in index order,
    /// then the header.
    pub items: Vec<StoreItem>,
    pub dropped: Vec<DroppedInvocation>,
    pub transactions_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bloom,
    pub gas_used: u64,
}

impl BlockOutput {
    pub fn header(&self) -> Option<&JsonRpcHeader> {
        match self.items.last().map(|item| &item.record) {
            Some(StoreRecord::Header(header)) => Some(header),
            _ => None,
        }
    }

    /// Number of items in `collection`.
    pub fn count(&self, collection: &str) -> usize {
        self.items
            .iter()
            .filter(|item| item.record.collection() == collection)
            .count()
    }
}

/// An invocation that survived decoding, ready for the fold.
#[derive(Clone, Debug)]
pub struct DecodedInvocation {
    pub index: u64,
    /// Index as delivered by the source, if any.
    pub reported_index: Option<u64>,
    pub source_hash: B256,
    pub recovered: RecoveredTransaction,
    pub transaction: JsonRpcTransaction,
    /// Filtered EVM logs in emission order.
    pub logs: Vec<Log>,
    /// Outcome without its raw events.
    pub outcome: ExecutionOutcome,
}

/// Runs the decode stage for one invocation at `index`.
///
/// # Errors
/// Any [`DecodeError`]; the caller drops the invocation.
pub fn decode_invocation(
    invocation: RawInvocation,
    index: u64,
    block: &BlockRef,
    filter: &EventFilter,
) -> Result<DecodedInvocation, DecodeError> {
    let reported_index = invocation.transaction_index;
    let source_hash = invocation.transaction_hash;
    let payload = decode_calldata(&invocation.calldata)?;
    let signature = RawSignature::from_limbs(&invocation.signature)?;
    let recovered = RecoveredTransaction::build(&payload, signature)?;
    let transaction = format_transaction(&recovered, block, index)?;

    let mut outcome = invocation.outcome;
    let events = std::mem::take(&mut outcome.events);
    let logs = filter.filter_events(&events);

    Ok(DecodedInvocation {
        index,
        reported_index,
        source_hash,
        recovered,
        transaction,
        logs,
        outcome,
    })
}

type DecodeResult = Result<DecodedInvocation, DroppedInvocation>;

/// Reconstructs Ethereum blocks from source blocks.
#[derive(Clone, Debug)]
pub struct BlockPipeline {
    config: PipelineConfig,
    filter: Arc<EventFilter>,
}

impl BlockPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            filter: Arc::new(EventFilter::new()),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Processes one block, decoding invocations concurrently.
    ///
    /// # Errors
    /// Any [`BlockError`]; no output is produced for the block.
    #[tracing::instrument(skip_all, fields(block_number = ?block.header.number))]
    pub async fn process_block(&self, block: SourceBlock) -> Result<BlockOutput, BlockError> {
        let ctx = BlockContext::from_header(&block.header, &self.config.chain)?;
        enter(PipelineStage::Decoding, ctx.number);

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_decodes.max(1)));
        let block_ref = ctx.block_ref();
        let total = block.invocations.len();
        let mut tasks = JoinSet::new();
        for (position, invocation) in block.invocations.into_iter().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| BlockError::Task(e.to_string()))?;
            let filter = Arc::clone(&self.filter);

            tasks.spawn_blocking(move || {
                let _permit = permit;
                (position, decode_one(invocation, &block_ref, &filter))
            });
        }

        // Results land in delivery order so drops are reported deterministically.
        let mut slots: Vec<Option<DecodeResult>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (position, result) = joined.map_err(|e| BlockError::Task(e.to_string()))?;
            slots[position] = Some(result);
        }

        self.aggregate(&ctx, slots.into_iter().flatten().collect())
    }

    /// Same as [`Self::process_block`] on the calling thread.
    ///
    /// # Errors
    /// Any [`BlockError`]; no output is produced for the block.
    #[tracing::instrument(skip_all, fields(block_number = ?block.header.number))]
    pub fn process_block_sequential(&self, block: SourceBlock) -> Result<BlockOutput, BlockError> {
        let ctx = BlockContext::from_header(&block.header, &self.config.chain)?;
        enter(PipelineStage::Decoding, ctx.number);

        let block_ref = ctx.block_ref();
        let decoded = block
            .invocations
            .into_iter()
            .map(|invocation| decode_one(invocation, &block_ref, &self.filter))
            .collect();

        self.aggregate(&ctx, decoded)
    }

    /// Ordered fold over the decode results, then header assembly.
    fn aggregate(
        &self,
        ctx: &BlockContext,
        decoded: Vec<DecodeResult>,
    ) -> Result<BlockOutput, BlockError> {
        enter(PipelineStage::Aggregating, ctx.number);

        let mut survivors = Vec::with_capacity(decoded.len());
        let mut dropped = Vec::new();
        for result in decoded {
            match result {
                Ok(mut invocation) => {
                    invocation.index = resolve_transaction_index(
                        invocation.reported_index,
                        invocation.source_hash,
                        self.config.require_transaction_index,
                    )?;
                    survivors.push(invocation);
                }
                Err(drop) => dropped.push(drop),
            }
        }
        survivors.sort_by_key(|invocation| invocation.index);

        let block_ref = ctx.block_ref();
        let mut acc = BlockAccumulator::new();
        let mut items = Vec::with_capacity(survivors.len() * 2 + 1);
        for invocation in survivors {
            let applied = acc.apply(
                invocation.index,
                &invocation.recovered.tx,
                &invocation.outcome,
                &invocation.logs,
            )?;
            let owner = TxRef {
                block: block_ref,
                transaction_index: invocation.index,
                transaction_hash: invocation.recovered.tx.hash(),
            };
            let logs = format_logs(&invocation.logs, &owner);
            let receipt = format_receipt(
                &invocation.recovered,
                &owner,
                &applied,
                logs.clone(),
                ctx.base_fee_per_gas,
            );

            items.push(StoreItem::new(StoreRecord::Transaction(invocation.transaction)));
            items.push(StoreItem::new(StoreRecord::Receipt(receipt)));
            items.extend(logs.into_iter().map(|log| StoreItem::new(StoreRecord::Log(log))));
        }

        enter(PipelineStage::Finalizing, ctx.number);
        let totals = acc.finish();
        items.push(StoreItem::new(StoreRecord::Header(assemble_header(ctx, &totals))));

        enter(PipelineStage::Done, ctx.number);
        tracing::info!(
            block_number = ctx.number,
            transactions = totals.transaction_count,
            dropped = dropped.len(),
            gas_used = totals.gas_used,
            "block reconstructed"
        );

        Ok(BlockOutput {
            items,
            dropped,
            transactions_root: totals.transactions_root,
            receipts_root: totals.receipts_root,
            logs_bloom: totals.logs_bloom,
            gas_used: totals.gas_used,
        })
    }
}

fn enter(stage: PipelineStage, block_number: u64) {
    tracing::debug!(block_number, %stage, "pipeline stage");
}

/// Decodes at the reported index; a missing index is formatted as 0, the only
/// value the fold can later resolve it to.
fn decode_one(invocation: RawInvocation, block: &BlockRef, filter: &EventFilter) -> DecodeResult {
    let transaction_hash = invocation.transaction_hash;
    let transaction_index = invocation.transaction_index;

    decode_invocation(invocation, transaction_index.unwrap_or(0), block, filter).map_err(|reason| {
        tracing::warn!(
            source_hash = %transaction_hash,
            transaction_index = ?transaction_index,
            error = %reason,
            "dropping invocation"
        );
        DroppedInvocation {
            transaction_hash,
            transaction_index,
            reason,
        }
    })
}
