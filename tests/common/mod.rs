//! Shared fixtures for the integration tests.
//!
//! Builds source blocks whose invocations carry really signed transactions,
//! encoded the way the source chain delivers them: the unsigned payload
//! spread one byte per calldata element behind the call metadata, and the
//! signature split into 128-bit limbs.

#![allow(dead_code)]

use alloy::consensus::{SignableTransaction, TxEip1559, TxEip2930, TxLegacy};
use alloy::eips::eip2930::{AccessList, AccessListItem};
use alloy::primitives::{Address, Bytes, PrimitiveSignature, TxKind, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use recon_data::store::Store;
use recon_data::{ExecutionOutcome, Felt, RawEvent, RawInvocation, SourceBlock, SourceHeader};

/// Chain id used by every typed fixture.
pub const CHAIN_ID: u64 = 1_263_227_476;

/// Creates an in-memory SQLite Store.
pub fn test_store() -> Store {
    Store::new(":memory:").expect("in-memory store should always open")
}

/// Well-known development key; its address is
/// `0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266`.
pub fn test_signer() -> PrivateKeySigner {
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
        .parse()
        .expect("valid development key")
}

pub fn source_header(number: u64) -> SourceHeader {
    SourceHeader {
        number: Some(number),
        hash: Some(B256::from(U256::from(number))),
        parent_hash: Some(B256::from(U256::from(number.saturating_sub(1)))),
        timestamp: Some(1_700_000_000 + number * 6),
        ..Default::default()
    }
}

pub fn source_block(number: u64, invocations: Vec<RawInvocation>) -> SourceBlock {
    SourceBlock {
        header: source_header(number),
        invocations,
    }
}

pub fn legacy_tx(nonce: u64, chain_id: u64) -> TxLegacy {
    TxLegacy {
        chain_id: Some(chain_id),
        nonce,
        gas_price: 1_000_000_000,
        gas_limit: 21_000,
        to: TxKind::Call(Address::repeat_byte(0x70)),
        value: U256::from(1_000u64 + nonce),
        input: Bytes::new(),
    }
}

pub fn access_list_tx(nonce: u64) -> TxEip2930 {
    TxEip2930 {
        chain_id: CHAIN_ID,
        nonce,
        gas_price: 2_000_000_000,
        gas_limit: 60_000,
        to: TxKind::Call(Address::repeat_byte(0x3c)),
        value: U256::ZERO,
        access_list: AccessList(vec![AccessListItem {
            address: Address::repeat_byte(0x3c),
            storage_keys: vec![B256::with_last_byte(1), B256::with_last_byte(2)],
        }]),
        input: Bytes::from_static(&[0xa9, 0x05, 0x9c, 0xbb]),
    }
}

pub fn fee_market_tx(nonce: u64) -> TxEip1559 {
    TxEip1559 {
        chain_id: CHAIN_ID,
        nonce,
        gas_limit: 200_000,
        max_fee_per_gas: 3_000_000_000,
        max_priority_fee_per_gas: 1_000_000,
        to: TxKind::Create,
        value: U256::ZERO,
        access_list: AccessList::default(),
        input: Bytes::from_static(&[0x60, 0x80, 0x60, 0x40, 0x52, 0x00]),
    }
}

/// Unsigned signing payload of `tx`.
pub fn signing_payload<T: SignableTransaction<PrimitiveSignature>>(tx: &T) -> Vec<u8> {
    let mut out = Vec::new();
    tx.encode_for_signing(&mut out);
    out
}

pub fn sign<T: SignableTransaction<PrimitiveSignature>>(tx: &T) -> PrimitiveSignature {
    test_signer()
        .sign_hash_sync(&tx.signature_hash())
        .expect("signing should succeed")
}

/// Single-call array carrying `payload` one byte per element.
pub fn call_array(payload: &[u8]) -> Vec<Felt> {
    let mut calldata = vec![
        U256::from(1u64),
        U256::from(0x1234u64),
        U256::from(0x5678u64),
        U256::ZERO,
        U256::from(payload.len()),
        U256::from(payload.len()),
    ];
    calldata.extend(payload.iter().map(|b| U256::from(*b)));
    calldata
}

/// `[r_low, r_high, s_low, s_high, v]`.
pub fn signature_limbs(r: U256, s: U256, v: u64) -> Vec<Felt> {
    let low = |word: U256| word & U256::from(u128::MAX);
    vec![low(r), r >> 128, low(s), s >> 128, U256::from(v)]
}

pub fn outcome(gas_used: u64, events: Vec<RawEvent>) -> ExecutionOutcome {
    ExecutionOutcome {
        success: true,
        gas_used,
        events,
    }
}

/// Invocation from raw parts.
pub fn raw_invocation(
    calldata: Vec<Felt>,
    signature: Vec<Felt>,
    index: Option<u64>,
    outcome: ExecutionOutcome,
) -> RawInvocation {
    RawInvocation {
        transaction_hash: B256::from(U256::from(0xface_0000u64 + index.unwrap_or(0xffff))),
        calldata,
        signature,
        transaction_index: index,
        outcome,
    }
}

/// Signed legacy invocation with an EIP-155 `v`.
pub fn legacy_invocation(tx: &TxLegacy, index: u64, outcome: ExecutionOutcome) -> RawInvocation {
    let sig = sign(tx);
    let chain_id = tx.chain_id.expect("fixtures are replay protected");
    let v = 35 + 2 * chain_id + sig.v() as u64;
    raw_invocation(
        call_array(&signing_payload(tx)),
        signature_limbs(sig.r(), sig.s(), v),
        Some(index),
        outcome,
    )
}

/// Signed typed invocation with `v` as the y-parity.
pub fn typed_invocation<T: SignableTransaction<PrimitiveSignature>>(
    tx: &T,
    index: u64,
    outcome: ExecutionOutcome,
) -> RawInvocation {
    let sig = sign(tx);
    raw_invocation(
        call_array(&signing_payload(tx)),
        signature_limbs(sig.r(), sig.s(), sig.v() as u64),
        Some(index),
        outcome,
    )
}

/// Source-chain encoding of an EVM log.
pub fn evm_event(address: Address, topics: &[B256], data: &[u8]) -> RawEvent {
    let mut keys = vec![U256::from_be_slice(address.as_slice())];
    for topic in topics {
        let word = U256::from_be_bytes(topic.0);
        keys.push(word & U256::from(u128::MAX));
        keys.push(word >> 128);
    }
    RawEvent {
        keys,
        data: data.iter().map(|b| U256::from(*b)).collect(),
    }
}

/// Host-contract event that never maps to an EVM log.
pub fn ignored_event(name: &str) -> RawEvent {
    RawEvent {
        keys: vec![recon_core::logs::starknet_keccak(name.as_bytes())],
        data: vec![U256::from(1u64)],
    }
}
