//! Fixed-width hex rendering for JSON-RPC output records.
//!
//! Every numeric field in an output record is zero-padded big-endian hex so
//! that records sort and compare as plain text in the sink:
//!
//! - quantities (`u64`): 8 bytes, `0x` + 16 hex digits
//! - words (`U256`, `u128`): 32 bytes, `0x` + 64 hex digits
//! - addresses: 20 bytes, hashes: 32 bytes, blooms: 256 bytes
//!
//! Byte strings (`input`, log `data`) are rendered unpadded.

use alloy::primitives::hex;
use alloy::primitives::{Address, Bloom, B256, U256};

/// Renders a 64-bit quantity as 8 zero-padded bytes.
pub fn quantity(value: u64) -> String {
    format!("0x{value:016x}")
}

/// Renders a 256-bit word as 32 zero-padded bytes.
pub fn word(value: U256) -> String {
    hex::encode_prefixed(value.to_be_bytes::<32>())
}

/// Renders a 128-bit amount (gas prices) as a 32-byte word.
pub fn word_u128(value: u128) -> String {
    word(U256::from(value))
}

/// Lowercase 20-byte address.
pub fn address(value: &Address) -> String {
    hex::encode_prefixed(value.as_slice())
}

/// Lowercase 32-byte hash.
pub fn hash(value: &B256) -> String {
    hex::encode_prefixed(value.as_slice())
}

/// Lowercase 256-byte logs bloom.
pub fn bloom(value: &Bloom) -> String {
    hex::encode_prefixed(value.as_slice())
}

/// Unpadded byte string.
pub fn bytes(value: &[u8]) -> String {
    hex::encode_prefixed(value)
}
