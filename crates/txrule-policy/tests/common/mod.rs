//! # Test Utilities for `txrule-policy`
//!
//! Builders for raw transactions on each chain family, so integration tests
//! can drive [`txrule_policy::PolicyEvaluator`] end to end.
//!
//! ## Proptest Strategies
//!
//! - [`raw_bytes`] - Arbitrary transaction payloads

#![allow(dead_code)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::str::FromStr;

use alloy_consensus::{SignableTransaction, TxEip1559};
use alloy_eips::eip2930::AccessList;
use alloy_primitives::{Address, Bytes, TxKind, U256};
use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::transaction::Version;
use bitcoin::{
    consensus, Amount, Network, OutPoint, ScriptBuf, Sequence, TxIn, TxOut, Txid, Witness,
};
use prost::Message;
use proptest::prelude::*;
use txrule_chain::cosmos::proto::{Any, BankMsgSend, Coin, Tx, TxBody};
use txrule_chain::cosmos::BANK_MSG_SEND;

// ============================================================================
// Bitcoin
// ============================================================================

/// Payment output of the reference transaction.
pub const BTC_PAYMENT: &str = "bc1qw5alzf5pu2hlnmn429jqq54qd9dvf2a2jjvvv0";

/// Change output of the reference transaction.
pub const BTC_CHANGE: &str = "bc1ql5624ufxtk67zlkr42rzh4pqlkfqpgfh220msa";

fn script_for(address: &str) -> ScriptBuf {
    bitcoin::Address::from_str(address)
        .expect("valid address")
        .require_network(Network::Bitcoin)
        .expect("mainnet address")
        .script_pubkey()
}

/// Wire-serialized transaction paying `outputs` from one dummy input.
pub fn bitcoin_tx(outputs: &[(&str, u64)]) -> Vec<u8> {
    let tx = bitcoin::Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::new(Txid::all_zeros(), 0),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::new(),
        }],
        output: outputs
            .iter()
            .map(|(address, value)| TxOut {
                value: Amount::from_sat(*value),
                script_pubkey: script_for(address),
            })
            .collect(),
    };
    consensus::serialize(&tx)
}

// ============================================================================
// EVM
// ============================================================================

/// Unsigned EIP-1559 payload.
pub fn evm_tx(chain_id: u64, to: Address, value: U256, data: Vec<u8>) -> Vec<u8> {
    let tx = TxEip1559 {
        chain_id,
        nonce: 0,
        gas_limit: 21_000,
        max_fee_per_gas: 20_000_000_000,
        max_priority_fee_per_gas: 1_000_000_000,
        to: TxKind::Call(to),
        value,
        access_list: AccessList::default(),
        input: Bytes::from(data),
    };
    let mut buf = Vec::new();
    tx.encode_for_signing(&mut buf);
    buf
}

// ============================================================================
// Cosmos
// ============================================================================

/// `Tx` with a single bank `MsgSend`.
pub fn cosmos_send(to: &str, denom: &str, amount: &str) -> Vec<u8> {
    let msg = BankMsgSend {
        from_address: "cosmos1sender".into(),
        to_address: to.into(),
        amount: vec![Coin {
            denom: denom.into(),
            amount: amount.into(),
        }],
    };
    Tx {
        body: Some(TxBody {
            messages: vec![Any {
                type_url: BANK_MSG_SEND.into(),
                value: msg.encode_to_vec(),
            }],
            memo: String::new(),
            timeout_height: 0,
        }),
        auth_info: vec![],
        signatures: vec![],
    }
    .encode_to_vec()
}

// ============================================================================
// Tron
// ============================================================================

/// Minimal protobuf writer for `raw_data` fixtures.
#[derive(Default)]
pub struct ProtoWriter(Vec<u8>);

impl ProtoWriter {
    fn varint(&mut self, mut v: u64) {
        while v >= 0x80 {
            self.0.push((v as u8) | 0x80);
            v >>= 7;
        }
        self.0.push(v as u8);
    }

    /// Varint field.
    pub fn uint(mut self, field: u64, v: u64) -> Self {
        self.varint(field << 3);
        self.varint(v);
        self
    }

    /// Length-delimited field.
    pub fn bytes(mut self, field: u64, b: &[u8]) -> Self {
        self.varint((field << 3) | 2);
        self.varint(b.len() as u64);
        self.0.extend_from_slice(b);
        self
    }

    /// Encoded bytes.
    pub fn finish(self) -> Vec<u8> {
        self.0
    }
}

/// `raw_data` with one `TransferContract` moving `amount` sun to `to`.
pub fn tron_trx_transfer(owner: &[u8; 21], to: &[u8; 21], amount: u64) -> Vec<u8> {
    let transfer = ProtoWriter::default()
        .bytes(1, owner)
        .bytes(2, to)
        .uint(3, amount)
        .finish();
    let any = ProtoWriter::default()
        .bytes(1, b"type.googleapis.com/protocol.TransferContract")
        .bytes(2, &transfer)
        .finish();
    let contract = ProtoWriter::default().uint(1, 1).bytes(2, &any).finish();
    ProtoWriter::default()
        .bytes(1, &[0x12, 0x34])
        .bytes(4, &[0xab; 8])
        .uint(8, 1_700_000_060_000)
        .bytes(11, &contract)
        .uint(14, 1_700_000_000_000)
        .finish()
}

/// A 21-byte TRON address with the given fill byte.
pub fn tron_raw_address(fill: u8) -> [u8; 21] {
    let mut raw = [fill; 21];
    raw[0] = 0x41;
    raw
}

// ============================================================================
// Strategies
// ============================================================================

/// Arbitrary payloads up to 512 bytes.
pub fn raw_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}
