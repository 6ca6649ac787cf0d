//! Raw source-chain event → Ethereum log.
//!
//! An EVM log surfaces on the source chain as an event whose first key is the
//! emitting EVM address, followed by each 32-byte topic split into
//! `(low, high)` 128-bit limbs, with one data element per byte. Events emitted
//! by the host contracts themselves (deployments, execution markers, token
//! events) share the stream and are filtered here.

use alloy::primitives::{keccak256, Bytes, Log, B256, U256};
use recon_data::types::felt_to_address;
use recon_data::{hex, Felt, JsonRpcLog, RawEvent};

use crate::format::TxRef;

/// Event names whose selectors never map to an EVM log.
pub const IGNORED_EVENTS: [&str; 5] = [
    "transaction_executed",
    "evm_contract_deployed",
    "Transfer",
    "Approval",
    "OwnershipTransferred",
];

/// EVM logs carry at most four topics.
const MAX_TOPICS: usize = 4;

/// Source-chain event selector: keccak-256 truncated to 250 bits.
pub fn starknet_keccak(name: &[u8]) -> Felt {
    let mask = (U256::from(1u64) << 250) - U256::from(1u64);
    U256::from_be_bytes(keccak256(name).0) & mask
}

/// Decides which events are EVM logs and converts them.
#[derive(Clone, Debug)]
pub struct EventFilter {
    ignored: Vec<Felt>,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            ignored: IGNORED_EVENTS
                .iter()
                .map(|name| starknet_keccak(name.as_bytes()))
                .collect(),
        }
    }
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ignored(&self, selector: &Felt) -> bool {
        self.ignored.contains(selector)
    }

    /// Converts `event` into an EVM log, or `None` if it is not one.
    pub fn to_eth_log(&self, event: &RawEvent) -> Option<Log> {
        let (emitter, topic_limbs) = event.keys.split_first()?;
        if self.is_ignored(emitter) {
            return None;
        }
        if topic_limbs.len() % 2 != 0 || topic_limbs.len() / 2 > MAX_TOPICS {
            return None;
        }
        let address = felt_to_address(*emitter)?;

        let mut topics = Vec::with_capacity(topic_limbs.len() / 2);
        for pair in topic_limbs.chunks_exact(2) {
            let (low, high) = (pair[0], pair[1]);
            if low.bit_len() > 128 || high.bit_len() > 128 {
                return None;
            }
            topics.push(B256::from((high << 128) | low));
        }

        let data = event
            .data
            .iter()
            .map(|byte| u8::try_from(*byte).ok())
            .collect::<Option<Vec<u8>>>()?;

        Log::new(address, topics, Bytes::from(data))
    }

    /// Converts every EVM log in `events`, keeping emission order.
    pub fn filter_events(&self, events: &[RawEvent]) -> Vec<Log> {
        events.iter().filter_map(|event| self.to_eth_log(event)).collect()
    }
}

/// Renders `log` as the `log_index`-th log of its transaction.
pub fn format_log(log: &Log, log_index: u64, owner: &TxRef) -> JsonRpcLog {
    JsonRpcLog {
        removed: false,
        log_index: hex::quantity(log_index),
        transaction_index: hex::quantity(owner.transaction_index),
        transaction_hash: hex::hash(&owner.transaction_hash),
        block_hash: hex::hash(&owner.block.hash),
        block_number: hex::quantity(owner.block.number),
        address: hex::address(&log.address),
        topics: log.data.topics().iter().map(hex::hash).collect(),
        data: hex::bytes(&log.data.data),
    }
}

/// Formats a transaction's filtered logs with indices from zero.
pub fn format_logs(logs: &[Log], owner: &TxRef) -> Vec<JsonRpcLog> {
    logs.iter()
        .enumerate()
        .map(|(i, log)| format_log(log, i as u64, owner))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::BlockRef;
    use alloy::primitives::Address;

    fn felt(v: u64) -> Felt {
        U256::from(v)
    }

    fn evm_event(topics: &[B256], data: &[u8]) -> RawEvent {
        let mut keys = vec![felt(0xabcd)];
        for topic in topics {
            let word = U256::from_be_bytes(topic.0);
            keys.push(word & U256::from(u128::MAX));
            keys.push(word >> 128);
        }
        RawEvent {
            keys,
            data: data.iter().map(|b| felt(u64::from(*b))).collect(),
        }
    }

    fn owner() -> TxRef {
        TxRef {
            block: BlockRef {
                number: 1,
                hash: B256::repeat_byte(0x01),
            },
            transaction_index: 2,
            transaction_hash: B256::repeat_byte(0x02),
        }
    }

    #[test]
    fn selectors_are_250_bits() {
        for name in IGNORED_EVENTS {
            assert!(starknet_keccak(name.as_bytes()).bit_len() <= 250);
        }
        // sn_keccak("Transfer")
        assert_eq!(
            starknet_keccak(b"Transfer"),
            "0x0099cd8bde557814842a3121e8ddfd433a539b8c9f14bf31ebf108d12e6196e9"
                .parse::<U256>()
                .expect("valid hex")
        );
    }

    #[test]
    fn rebuilds_topics_from_limbs() {
        let topic = B256::from(U256::from(0x1234u64) << 200);
        let log = EventFilter::new()
            .to_eth_log(&evm_event(&[topic], &[0xaa, 0x00, 0xff]))
            .expect("evm log");

        let emitter: Address = "0x000000000000000000000000000000000000abcd"
            .parse()
            .expect("valid address");
        assert_eq!(log.address, emitter);
        assert_eq!(log.data.topics(), &[topic]);
        assert_eq!(&log.data.data[..], &[0xaa, 0x00, 0xff]);
    }

    #[test]
    fn filters_ignored_selectors() {
        let filter = EventFilter::new();
        for name in IGNORED_EVENTS {
            let event = RawEvent {
                keys: vec![starknet_keccak(name.as_bytes())],
                data: vec![],
            };
            assert!(filter.to_eth_log(&event).is_none(), "{name} should be filtered");
        }
    }

    #[test]
    fn filters_unexpected_shapes() {
        let filter = EventFilter::new();

        let mut even_keys = evm_event(&[B256::ZERO], &[]);
        even_keys.keys.pop();
        assert!(filter.to_eth_log(&even_keys).is_none());

        let five_topics = evm_event(&[B256::ZERO; 5], &[]);
        assert!(filter.to_eth_log(&five_topics).is_none());

        let wide_data = RawEvent {
            keys: vec![felt(1)],
            data: vec![felt(0x100)],
        };
        assert!(filter.to_eth_log(&wide_data).is_none());

        let wide_emitter = RawEvent {
            keys: vec![U256::from(1u64) << 200],
            data: vec![],
        };
        assert!(filter.to_eth_log(&wide_emitter).is_none());

        assert!(filter.to_eth_log(&RawEvent::default()).is_none());
    }

    #[test]
    fn log_indices_restart_per_transaction() {
        let filter = EventFilter::new();
        let events = vec![
            evm_event(&[B256::repeat_byte(1)], &[1]),
            RawEvent {
                keys: vec![starknet_keccak(b"transaction_executed")],
                data: vec![],
            },
            evm_event(&[], &[2]),
        ];

        let logs = filter.filter_events(&events);
        assert_eq!(logs.len(), 2);

        let records = format_logs(&logs, &owner());
        assert_eq!(records[0].log_index, "0x0000000000000000");
        assert_eq!(records[1].log_index, "0x0000000000000001");
        assert_eq!(records[1].transaction_index, "0x0000000000000002");
        assert_eq!(records[1].data, "0x02");
        assert!(records[1].topics.is_empty());
        assert!(!records[0].removed);
    }
}
