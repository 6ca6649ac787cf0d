//! 2048-bit logs bloom.
//!
//! Thin value wrapper over alloy's [`Bloom`], which implements the reference
//! `m3_2048` procedure: keccak the item, take three 11-bit indices from the
//! first six bytes of the digest, set those bits.

use alloy::primitives::{Address, Bloom, BloomInput, Log, B256};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BloomFilter(Bloom);

impl BloomFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the three bits derived from `item`.
    pub fn add(&mut self, item: &[u8]) {
        self.0.accrue(BloomInput::Raw(item));
    }

    /// Adds a log's address and every topic.
    pub fn add_log(&mut self, address: &Address, topics: &[B256]) {
        self.add(address.as_slice());
        for topic in topics {
            self.add(topic.as_slice());
        }
    }

    /// Bitwise OR of `other` into `self`.
    pub fn merge(&mut self, other: &Self) {
        self.0.accrue_bloom(&other.0);
    }

    pub fn contains(&self, item: &[u8]) -> bool {
        self.0.contains_input(BloomInput::Raw(item))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_zero()
    }

    pub fn into_inner(self) -> Bloom {
        self.0
    }

    pub fn as_bloom(&self) -> &Bloom {
        &self.0
    }

    /// Bloom over every log of one receipt.
    pub fn from_logs<'a>(logs: impl IntoIterator<Item = &'a Log>) -> Self {
        let mut bloom = Self::new();
        for log in logs {
            bloom.add_log(&log.address, log.data.topics());
        }
        bloom
    }
}

impl From<Bloom> for BloomFilter {
    fn from(bloom: Bloom) -> Self {
        Self(bloom)
    }
}
