//! RLP helpers on top of `alloy-rlp`.
//!
//! `alloy-rlp` supplies the canonical integer/string/list encoding. This
//! module adds the two pieces the pipeline needs around it: trie keys for
//! transaction positions, and a strict list reader that rejects trailing bytes
//! so that a payload either decodes exactly or not at all.

use alloy::rlp::{Decodable, Encodable, Header};

use crate::error::DecodeError;

/// RLP encoding of a transaction position, used as the trie key.
///
/// Zero encodes as the empty string (`0x80`), everything else as its minimal
/// big-endian bytes.
pub fn encode_index(index: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(9);
    index.encode(&mut out);
    out
}

/// Reads the fields of one RLP list, in order.
pub struct ListReader<'a> {
    payload: &'a [u8],
}

impl<'a> ListReader<'a> {
    /// Consumes a list header and its payload from `buf`.
    ///
    /// # Errors
    /// Fails if the header is not a list or the payload is truncated.
    pub fn new(buf: &mut &'a [u8]) -> Result<Self, DecodeError> {
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(DecodeError::MalformedRlp("expected list".to_string()));
        }
        if buf.len() < header.payload_length {
            return Err(DecodeError::MalformedRlp(format!(
                "list payload truncated: want {} bytes, have {}",
                header.payload_length,
                buf.len()
            )));
        }
        let (payload, rest) = buf.split_at(header.payload_length);
        *buf = rest;
        Ok(Self { payload })
    }

    /// Reads a whole buffer as exactly one list, with nothing after it.
    pub fn exact(mut buf: &'a [u8]) -> Result<Self, DecodeError> {
        let reader = Self::new(&mut buf)?;
        if !buf.is_empty() {
            return Err(DecodeError::MalformedRlp(format!(
                "{} trailing bytes after list",
                buf.len()
            )));
        }
        Ok(reader)
    }

    /// Decodes the next field.
    pub fn field<T: Decodable>(&mut self) -> Result<T, DecodeError> {
        if self.payload.is_empty() {
            return Err(DecodeError::MalformedRlp("list has too few fields".to_string()));
        }
        Ok(T::decode(&mut self.payload)?)
    }

    /// True once every field has been read.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Asserts that every field has been read.
    pub fn finish(self) -> Result<(), DecodeError> {
        if self.payload.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::MalformedRlp("list has too many fields".to_string()))
        }
    }
}
