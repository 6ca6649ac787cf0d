//! Extracts the embedded transaction payload from an invocation's call array.
//!
//! Layout of a single-call array:
//!
//! | index | element                 |
//! |-------|-------------------------|
//! | 0     | call count (must be 1)  |
//! | 1     | target contract         |
//! | 2     | entry-point selector    |
//! | 3     | data offset             |
//! | 4     | data length             |
//! | 5     | payload length          |
//! | 6..   | one element per byte    |
//!
//! The metadata elements are required but not interpreted.

use alloy::primitives::{Bytes, U256};
use recon_data::Felt;

use crate::error::DecodeError;

/// Elements preceding the payload.
pub const CALL_METADATA_LEN: usize = 6;

/// Returns the unsigned transaction bytes embedded in `calldata`.
///
/// Each payload element contributes its minimal big-endian bytes; zero
/// contributes one `0x00` byte.
///
/// # Errors
/// - `MissingCalldata` if the array is empty, shorter than the metadata
///   prefix, or carries no payload.
/// - `MultiCallUnsupported` if the call count is not 1.
pub fn decode_calldata(calldata: &[Felt]) -> Result<Bytes, DecodeError> {
    let Some(call_count) = calldata.first() else {
        return Err(DecodeError::MissingCalldata { len: 0 });
    };
    if *call_count != U256::from(1u64) {
        return Err(DecodeError::MultiCallUnsupported(call_count.to_string()));
    }
    if calldata.len() <= CALL_METADATA_LEN {
        return Err(DecodeError::MissingCalldata {
            len: calldata.len(),
        });
    }

    let payload = &calldata[CALL_METADATA_LEN..];
    let mut bytes = Vec::with_capacity(payload.len());
    for element in payload {
        if element.is_zero() {
            bytes.push(0);
        } else {
            bytes.extend_from_slice(&element.to_be_bytes_trimmed_vec());
        }
    }
    Ok(bytes.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call_array(payload: &[u64]) -> Vec<Felt> {
        let mut data = vec![
            U256::from(1u64),
            U256::from(0xdeadu64),
            U256::from(0xbeefu64),
            U256::ZERO,
            U256::from(payload.len() as u64),
            U256::from(payload.len() as u64),
        ];
        data.extend(payload.iter().map(|b| U256::from(*b)));
        data
    }

    #[test]
    fn concatenates_payload_bytes() {
        let bytes = decode_calldata(&call_array(&[0xc0, 0x01, 0xff])).expect("valid call");
        assert_eq!(&bytes[..], &[0xc0, 0x01, 0xff]);
    }

    #[test]
    fn zero_elements_keep_their_byte() {
        let bytes = decode_calldata(&call_array(&[0x94, 0x00, 0x00, 0x12])).expect("valid call");
        assert_eq!(&bytes[..], &[0x94, 0x00, 0x00, 0x12]);
    }

    #[test]
    fn wide_elements_use_minimal_big_endian() {
        let bytes = decode_calldata(&call_array(&[0x0102, 0x03])).expect("valid call");
        assert_eq!(&bytes[..], &[0x01, 0x02, 0x03]);
    }

    #[test]
    fn rejects_multi_call_arrays() {
        let mut data = call_array(&[0xc0]);
        data[0] = U256::from(2u64);
        assert!(matches!(
            decode_calldata(&data),
            Err(DecodeError::MultiCallUnsupported(_))
        ));

        data[0] = U256::ZERO;
        assert!(matches!(
            decode_calldata(&data),
            Err(DecodeError::MultiCallUnsupported(_))
        ));
    }

    #[test]
    fn rejects_missing_or_short_calldata() {
        assert_eq!(
            decode_calldata(&[]),
            Err(DecodeError::MissingCalldata { len: 0 })
        );

        let prefix_only = call_array(&[]);
        assert_eq!(
            decode_calldata(&prefix_only),
            Err(DecodeError::MissingCalldata { len: 6 })
        );

        let truncated = &prefix_only[..3];
        assert_eq!(
            decode_calldata(truncated),
            Err(DecodeError::MissingCalldata { len: 3 })
        );
    }
}
