//! recon-core: Ethereum block reconstruction from source-chain invocations.
//!
//! Decodes the transaction embedded in each invocation, recovers its sender,
//! rebuilds receipts and logs, and folds everything into the transaction and
//! receipt trie roots and logs bloom of an Ethereum header.

pub mod bloom;
pub mod calldata;
pub mod config;
pub mod error;
pub mod format;
pub mod header;
pub mod logs;
pub mod pipeline;
pub mod receipt;
pub mod rlp;
pub mod signature;
pub mod transaction;
pub mod trie;

pub use config::{ChainParams, PipelineConfig};
pub use error::{BlockError, DecodeError, DroppedInvocation};
pub use pipeline::{BlockOutput, BlockPipeline, PipelineStage};
pub use transaction::{RecoveredTransaction, TypedTransaction, UnsignedTx};
