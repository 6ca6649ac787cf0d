//! recon-data crate

pub mod hex;
pub mod source;
pub mod store;
pub mod types;

pub use types::{
    ExecutionOutcome, Felt, JsonRpcHeader, JsonRpcLog, JsonRpcReceipt, JsonRpcTransaction,
    RawEvent, RawInvocation, SourceBlock, SourceHeader, StoreItem, StoreRecord,
};
