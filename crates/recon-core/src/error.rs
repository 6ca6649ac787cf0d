//! Error taxonomy of the reconstruction pipeline.
//!
//! [`DecodeError`]s drop a single invocation and the block continues.
//! [`BlockError`]s abort the whole block; no items are emitted for it.
//! Filtered events are not errors at all and never surface here.

use alloy::primitives::B256;
use thiserror::Error;

/// Reasons a single invocation is excluded from a block's outputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("call array encodes {0} calls, only single-call invocations are supported")]
    MultiCallUnsupported(String),

    #[error("calldata is missing or shorter than the call metadata prefix ({len} elements)")]
    MissingCalldata { len: usize },

    #[error("signature must have exactly 5 limbs, got {0}")]
    InvalidSignatureLength(usize),

    #[error("unrecognized transaction type byte 0x{0:02x}")]
    UnrecognizedTransactionType(u8),

    #[error("malformed transaction RLP: {0}")]
    MalformedRlp(String),

    #[error("invalid signature v value {v}: {reason}")]
    InvalidSignatureV { v: String, reason: &'static str },

    #[error("failed to recover transaction sender: {0}")]
    SignerRecovery(String),

    #[error("transaction is missing its signature")]
    UnsignedTransaction,
}

impl From<alloy::rlp::Error> for DecodeError {
    fn from(err: alloy::rlp::Error) -> Self {
        Self::MalformedRlp(err.to_string())
    }
}

/// Failures that abort processing of an entire block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    #[error("source header is missing required field `{0}`")]
    IncompleteSourceHeader(&'static str),

    #[error("invocation {0} has no transaction index")]
    MissingTransactionIndex(B256),

    #[error("transaction index {0} appears more than once in the block")]
    DuplicateTransactionIndex(u64),

    #[error("cumulative gas used overflowed at transaction index {0}")]
    GasOverflow(u64),

    #[error("decode task failed: {0}")]
    Task(String),
}

/// A dropped invocation and why it was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedInvocation {
    /// Source-chain transaction hash.
    pub transaction_hash: B256,
    /// Reported transaction index, if any.
    pub transaction_index: Option<u64>,
    pub reason: DecodeError,
}
