//! Merkle-Patricia trie for transaction and receipt roots.
//!
//! Leaves are buffered in key order and hashed in one pass through
//! `alloy-trie`'s [`HashBuilder`], which produces the standard node encoding
//! (RLP nodes, keccak-256, inline nodes shorter than 32 bytes). The builder
//! needs leaves in ascending nibble order, so keys are kept in a `BTreeMap`;
//! byte-lexicographic order of whole-byte keys is the same as nibble order.

use std::collections::BTreeMap;

use alloy::primitives::B256;
use alloy_trie::{HashBuilder, Nibbles, EMPTY_ROOT_HASH};

/// Insert-only authenticated map producing a 32-byte root.
#[derive(Clone, Debug, Default)]
pub struct MerklePatriciaTrie {
    leaves: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MerklePatriciaTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `key`, returning the value it replaced.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Option<Vec<u8>> {
        self.leaves.insert(key, value)
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.leaves.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Root hash over every leaf inserted so far.
    ///
    /// Callers read this only after the last `put` of a block.
    pub fn root(&self) -> B256 {
        if self.leaves.is_empty() {
            return EMPTY_ROOT_HASH;
        }

        let mut hb = HashBuilder::default();
        for (key, value) in &self.leaves {
            hb.add_leaf(Nibbles::unpack(key), value);
        }
        hb.root()
    }
}
