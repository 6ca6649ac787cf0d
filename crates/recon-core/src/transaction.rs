//! Typed Ethereum transactions rebuilt from invocation payloads.
//!
//! An invocation carries the *unsigned* signing payload of its transaction.
//! The variant is chosen by the first payload byte:
//!
//! - `0x01` → access-list (EIP-2930), `0x01 ‖ rlp([chainId, nonce, gasPrice,
//!   gas, to, value, data, accessList])`
//! - `0x02` → fee-market (EIP-1559), `0x02 ‖ rlp([chainId, nonce,
//!   maxPriorityFeePerGas, maxFeePerGas, gas, to, value, data, accessList])`
//! - a list prefix (`>= 0xc0`) → legacy, `rlp([nonce, gasPrice, gas, to,
//!   value, data])` optionally followed by EIP-155 `[chainId, 0, 0]`
//!
//! Anything else is rejected. The signature is attached per variant and the
//! sender is always recovered from it, never taken from the input.

use alloy::consensus::{SignableTransaction, Signed, TxEip1559, TxEip2930, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::{Decodable2718, Encodable2718};
use alloy::eips::eip2930::AccessList;
use alloy::primitives::{Address, Bytes, ChainId, PrimitiveSignature, TxKind, B256, U256};

use crate::error::DecodeError;
use crate::rlp::ListReader;
use crate::signature::RawSignature;

/// Type byte of access-list transactions.
pub const ACCESS_LIST_TX_TYPE: u8 = 0x01;
/// Type byte of fee-market transactions.
pub const FEE_MARKET_TX_TYPE: u8 = 0x02;

/// Smallest legacy `v` that carries an EIP-155 chain id.
const EIP155_V_OFFSET: u64 = 35;

/// Transaction decoded from its signing payload, not yet signed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnsignedTx {
    /// `chain_id` is set only if the payload carried EIP-155 fields.
    Legacy(TxLegacy),
    AccessList(TxEip2930),
    FeeMarket(TxEip1559),
}

impl UnsignedTx {
    /// Decodes a signing payload, dispatching on its first byte.
    ///
    /// # Errors
    /// `UnrecognizedTransactionType` for an unknown leading byte, `MalformedRlp`
    /// if the chosen schema does not decode exactly.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let Some(&first) = payload.first() else {
            return Err(DecodeError::MalformedRlp("empty transaction payload".to_string()));
        };

        match first {
            ACCESS_LIST_TX_TYPE => decode_access_list(&payload[1..]).map(Self::AccessList),
            FEE_MARKET_TX_TYPE => decode_fee_market(&payload[1..]).map(Self::FeeMarket),
            0xc0..=0xff => decode_legacy(payload).map(Self::Legacy),
            other => Err(DecodeError::UnrecognizedTransactionType(other)),
        }
    }

    /// Attaches `sig`, validating `v` for this variant.
    ///
    /// Legacy transactions need an EIP-155 `v` (`>= 35`); the chain id is
    /// derived from it and must agree with the payload's, if present. Typed
    /// transactions take `v` as the raw y-parity (0 or 1).
    ///
    /// # Errors
    /// `InvalidSignatureV` if `v` is not acceptable for the variant.
    pub fn into_signed(self, sig: RawSignature) -> Result<TypedTransaction, DecodeError> {
        match self {
            Self::Legacy(mut tx) => {
                let v = u64::try_from(sig.v).map_err(|_| invalid_v(sig.v, "does not fit u64"))?;
                if v < EIP155_V_OFFSET {
                    return Err(invalid_v(
                        sig.v,
                        "legacy transactions require EIP-155 replay protection",
                    ));
                }
                let chain_id = (v - EIP155_V_OFFSET) / 2;
                let y_parity = (v - EIP155_V_OFFSET) % 2 == 1;
                if tx.chain_id.is_some_and(|id| id != chain_id) {
                    return Err(invalid_v(sig.v, "chain id disagrees with the payload"));
                }
                tx.chain_id = Some(chain_id);
                let signature = PrimitiveSignature::new(sig.r, sig.s, y_parity);
                Ok(TypedTransaction::Legacy(tx.into_signed(signature)))
            }
            Self::AccessList(tx) => {
                let signature = PrimitiveSignature::new(sig.r, sig.s, y_parity(sig.v)?);
                Ok(TypedTransaction::AccessList(tx.into_signed(signature)))
            }
            Self::FeeMarket(tx) => {
                let signature = PrimitiveSignature::new(sig.r, sig.s, y_parity(sig.v)?);
                Ok(TypedTransaction::FeeMarket(tx.into_signed(signature)))
            }
        }
    }
}

fn invalid_v(v: U256, reason: &'static str) -> DecodeError {
    DecodeError::InvalidSignatureV {
        v: v.to_string(),
        reason,
    }
}

fn y_parity(v: U256) -> Result<bool, DecodeError> {
    if v == U256::ZERO {
        Ok(false)
    } else if v == U256::from(1u64) {
        Ok(true)
    } else {
        Err(invalid_v(v, "typed transactions take a y-parity of 0 or 1"))
    }
}

fn decode_legacy(payload: &[u8]) -> Result<TxLegacy, DecodeError> {
    let mut list = ListReader::exact(payload)?;
    let mut tx = TxLegacy {
        chain_id: None,
        nonce: list.field()?,
        gas_price: list.field()?,
        gas_limit: list.field()?,
        to: list.field()?,
        value: list.field()?,
        input: list.field()?,
    };

    if !list.is_empty() {
        let chain_id: ChainId = list.field()?;
        let r: U256 = list.field()?;
        let s: U256 = list.field()?;
        if !r.is_zero() || !s.is_zero() {
            return Err(DecodeError::MalformedRlp(
                "EIP-155 signing fields must end in [0, 0]".to_string(),
            ));
        }
        tx.chain_id = Some(chain_id);
    }
    list.finish()?;
    Ok(tx)
}

fn decode_access_list(payload: &[u8]) -> Result<TxEip2930, DecodeError> {
    let mut list = ListReader::exact(payload)?;
    let tx = TxEip2930 {
        chain_id: list.field()?,
        nonce: list.field()?,
        gas_price: list.field()?,
        gas_limit: list.field()?,
        to: list.field()?,
        value: list.field()?,
        input: list.field()?,
        access_list: list.field()?,
    };
    list.finish()?;
    Ok(tx)
}

fn decode_fee_market(payload: &[u8]) -> Result<TxEip1559, DecodeError> {
    let mut list = ListReader::exact(payload)?;
    let tx = TxEip1559 {
        chain_id: list.field()?,
        nonce: list.field()?,
        max_priority_fee_per_gas: list.field()?,
        max_fee_per_gas: list.field()?,
        gas_limit: list.field()?,
        to: list.field()?,
        value: list.field()?,
        input: list.field()?,
        access_list: list.field()?,
    };
    list.finish()?;
    Ok(tx)
}

/// Signed transaction of one of the three supported variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypedTransaction {
    Legacy(Signed<TxLegacy>),
    AccessList(Signed<TxEip2930>),
    FeeMarket(Signed<TxEip1559>),
}

impl TypedTransaction {
    /// Decodes an EIP-2718 signed serialization (as stored in the trie).
    ///
    /// # Errors
    /// `UnrecognizedTransactionType` for a leading byte other than `0x01`,
    /// `0x02` or a list header, and for well-formed blob or set-code
    /// envelopes. `MalformedRlp` for anything that does not decode exactly.
    pub fn decode_signed(bytes: &[u8]) -> Result<Self, DecodeError> {
        let Some(&first) = bytes.first() else {
            return Err(DecodeError::MalformedRlp("empty transaction".to_string()));
        };
        if !matches!(first, ACCESS_LIST_TX_TYPE | FEE_MARKET_TX_TYPE | 0xc0..=0xff) {
            return Err(DecodeError::UnrecognizedTransactionType(first));
        }

        let mut buf = bytes;
        let envelope = TxEnvelope::decode_2718(&mut buf)
            .map_err(|err| DecodeError::MalformedRlp(err.to_string()))?;
        if !buf.is_empty() {
            return Err(DecodeError::MalformedRlp(format!(
                "{} trailing bytes after transaction",
                buf.len()
            )));
        }

        match envelope {
            TxEnvelope::Legacy(tx) => Ok(Self::Legacy(tx)),
            TxEnvelope::Eip2930(tx) => Ok(Self::AccessList(tx)),
            TxEnvelope::Eip1559(tx) => Ok(Self::FeeMarket(tx)),
            other => Err(DecodeError::UnrecognizedTransactionType(
                other.tx_type() as u8,
            )),
        }
    }

    /// EIP-2718 type byte (0 for legacy).
    pub const fn tx_type(&self) -> u8 {
        match self {
            Self::Legacy(_) => 0x00,
            Self::AccessList(_) => ACCESS_LIST_TX_TYPE,
            Self::FeeMarket(_) => FEE_MARKET_TX_TYPE,
        }
    }

    /// Keccak-256 of the signed serialization.
    pub fn hash(&self) -> B256 {
        match self {
            Self::Legacy(tx) => *tx.hash(),
            Self::AccessList(tx) => *tx.hash(),
            Self::FeeMarket(tx) => *tx.hash(),
        }
    }

    /// Digest the sender signed.
    pub fn signature_hash(&self) -> B256 {
        match self {
            Self::Legacy(tx) => tx.signature_hash(),
            Self::AccessList(tx) => tx.signature_hash(),
            Self::FeeMarket(tx) => tx.signature_hash(),
        }
    }

    pub fn signature(&self) -> &PrimitiveSignature {
        match self {
            Self::Legacy(tx) => tx.signature(),
            Self::AccessList(tx) => tx.signature(),
            Self::FeeMarket(tx) => tx.signature(),
        }
    }

    /// `v` as it appears on the wire: EIP-155 encoded for legacy, y-parity
    /// otherwise.
    pub fn v(&self) -> u64 {
        let parity = self.signature().v() as u64;
        match self {
            Self::Legacy(tx) => match tx.tx().chain_id {
                Some(chain_id) => EIP155_V_OFFSET + 2 * chain_id + parity,
                None => 27 + parity,
            },
            _ => parity,
        }
    }

    /// Recovers the signer from the signature and signing hash.
    ///
    /// # Errors
    /// `SignerRecovery` if the signature does not recover to a public key.
    pub fn recover_sender(&self) -> Result<Address, DecodeError> {
        self.signature()
            .recover_address_from_prehash(&self.signature_hash())
            .map_err(|e| DecodeError::SignerRecovery(e.to_string()))
    }

    /// Canonical signed serialization: legacy RLP list, or type byte ‖ RLP.
    pub fn encoded_2718(&self) -> Vec<u8> {
        self.to_envelope().encoded_2718()
    }

    pub fn to_envelope(&self) -> TxEnvelope {
        match self {
            Self::Legacy(tx) => TxEnvelope::Legacy(tx.clone()),
            Self::AccessList(tx) => TxEnvelope::Eip2930(tx.clone()),
            Self::FeeMarket(tx) => TxEnvelope::Eip1559(tx.clone()),
        }
    }

    pub fn chain_id(&self) -> Option<ChainId> {
        match self {
            Self::Legacy(tx) => tx.tx().chain_id,
            Self::AccessList(tx) => Some(tx.tx().chain_id),
            Self::FeeMarket(tx) => Some(tx.tx().chain_id),
        }
    }

    pub fn nonce(&self) -> u64 {
        match self {
            Self::Legacy(tx) => tx.tx().nonce,
            Self::AccessList(tx) => tx.tx().nonce,
            Self::FeeMarket(tx) => tx.tx().nonce,
        }
    }

    pub fn gas_limit(&self) -> u64 {
        match self {
            Self::Legacy(tx) => tx.tx().gas_limit,
            Self::AccessList(tx) => tx.tx().gas_limit,
            Self::FeeMarket(tx) => tx.tx().gas_limit,
        }
    }

    /// Explicit gas price; `None` for fee-market transactions.
    pub fn gas_price(&self) -> Option<u128> {
        match self {
            Self::Legacy(tx) => Some(tx.tx().gas_price),
            Self::AccessList(tx) => Some(tx.tx().gas_price),
            Self::FeeMarket(_) => None,
        }
    }

    pub fn max_fee_per_gas(&self) -> Option<u128> {
        match self {
            Self::FeeMarket(tx) => Some(tx.tx().max_fee_per_gas),
            _ => None,
        }
    }

    pub fn max_priority_fee_per_gas(&self) -> Option<u128> {
        match self {
            Self::FeeMarket(tx) => Some(tx.tx().max_priority_fee_per_gas),
            _ => None,
        }
    }

    /// Recipient; `None` for contract creation.
    pub fn to(&self) -> Option<Address> {
        let kind = match self {
            Self::Legacy(tx) => tx.tx().to,
            Self::AccessList(tx) => tx.tx().to,
            Self::FeeMarket(tx) => tx.tx().to,
        };
        match kind {
            TxKind::Call(to) => Some(to),
            TxKind::Create => None,
        }
    }

    pub fn value(&self) -> U256 {
        match self {
            Self::Legacy(tx) => tx.tx().value,
            Self::AccessList(tx) => tx.tx().value,
            Self::FeeMarket(tx) => tx.tx().value,
        }
    }

    pub fn input(&self) -> &Bytes {
        match self {
            Self::Legacy(tx) => &tx.tx().input,
            Self::AccessList(tx) => &tx.tx().input,
            Self::FeeMarket(tx) => &tx.tx().input,
        }
    }

    pub fn access_list(&self) -> Option<&AccessList> {
        match self {
            Self::Legacy(_) => None,
            Self::AccessList(tx) => Some(&tx.tx().access_list),
            Self::FeeMarket(tx) => Some(&tx.tx().access_list),
        }
    }
}

/// A signed transaction together with its recovered sender.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecoveredTransaction {
    pub tx: TypedTransaction,
    pub sender: Address,
}

impl RecoveredTransaction {
    /// Decodes `payload`, attaches `sig` and recovers the sender.
    ///
    /// # Errors
    /// Any of the per-invocation decode errors of the variant dispatch,
    /// signature attachment or sender recovery.
    pub fn build(payload: &[u8], sig: RawSignature) -> Result<Self, DecodeError> {
        let tx = UnsignedTx::decode(payload)?.into_signed(sig)?;
        let sender = tx.recover_sender()?;
        Ok(Self { tx, sender })
    }

    /// Address of the contract deployed by a creation transaction.
    pub fn contract_address(&self) -> Option<Address> {
        match self.tx.to() {
            None => Some(self.sender.create(self.tx.nonce())),
            Some(_) => None,
        }
    }
}
