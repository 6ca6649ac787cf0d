//! Reassembles an ECDSA signature from source-chain limbs.
//!
//! The source chain stores `r` and `s` as two 128-bit limbs each (low first)
//! followed by `v`. Range and parity checks happen when the signature is
//! attached to a concrete transaction variant, since what `v` means depends
//! on the variant.

use alloy::primitives::U256;
use recon_data::Felt;

use crate::error::DecodeError;

/// Number of limbs in a source-chain signature.
pub const SIGNATURE_LIMBS: usize = 5;

/// Signature components before variant-specific validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawSignature {
    pub r: U256,
    pub s: U256,
    pub v: U256,
}

impl RawSignature {
    /// Builds `r = r_high << 128 | r_low`, `s = s_high << 128 | s_low`, `v`.
    ///
    /// # Errors
    /// `InvalidSignatureLength` unless exactly five limbs are given.
    pub fn from_limbs(limbs: &[Felt]) -> Result<Self, DecodeError> {
        let [r_low, r_high, s_low, s_high, v] = limbs else {
            return Err(DecodeError::InvalidSignatureLength(limbs.len()));
        };

        Ok(Self {
            r: (*r_high << 128) | *r_low,
            s: (*s_high << 128) | *s_low,
            v: *v,
        })
    }
}
