//! Unsigned EIP-1559 transaction decoding and post-approval hashing.
//!
//! Wallets hand the policy core an *unsigned* dynamic-fee transaction: the
//! `0x02` envelope byte (optional) followed by the nine-field RLP list
//!
//! ```text
//! [chain_id, nonce, max_priority_fee_per_gas, max_fee_per_gas, gas_limit,
//!  to, value, data, access_list]
//! ```
//!
//! Signed payloads (twelve fields) are rejected: the core evaluates what is
//! about to be signed, not what already was.

use alloy_consensus::transaction::RlpEcdsaEncodableTx;
use alloy_consensus::TxEip1559;
use alloy_eips::eip2930::AccessList;
use alloy_primitives::{keccak256, Address, Bytes, Signature, TxKind, B256, U256};
use alloy_rlp::Decodable;
use txrule_core::error::ParseError;
use txrule_core::{DecodedTransaction, PolicyError};

use super::rlp::{
    decode_bytes, decode_list, decode_optional_address, decode_u256, decode_u64, eip1559_payload,
    EIP1559_TX_TYPE,
};

/// Number of RLP fields in an unsigned EIP-1559 payload.
const UNSIGNED_FIELD_COUNT: usize = 9;

/// A decoded unsigned EIP-1559 transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmTransaction {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Sender nonce.
    pub nonce: u64,
    /// Priority fee cap.
    pub max_priority_fee_per_gas: U256,
    /// Total fee cap.
    pub max_fee_per_gas: U256,
    /// Gas limit.
    pub gas_limit: u64,
    /// Destination; `None` for contract creation.
    pub to: Option<Address>,
    /// Native value.
    pub value: U256,
    /// Call data.
    pub data: Vec<u8>,
    /// EIP-2930 access list.
    pub access_list: AccessList,
    /// Keccak-256 of the `0x02`-prefixed unsigned payload.
    pub signing_hash: B256,
}

impl DecodedTransaction for EvmTransaction {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn hash(&self) -> B256 {
        self.signing_hash
    }

    fn from(&self) -> Option<Address> {
        None
    }

    fn to(&self) -> Option<Address> {
        self.to
    }

    fn value(&self) -> U256 {
        self.value
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn nonce(&self) -> u64 {
        self.nonce
    }

    fn gas_price(&self) -> U256 {
        self.max_fee_per_gas
    }

    fn gas_limit(&self) -> u64 {
        self.gas_limit
    }
}

/// Parse a hex-encoded unsigned EIP-1559 transaction (optional `0x` prefix).
///
/// # Errors
///
/// Returns [`PolicyError::MalformedInput`] for bad hex or RLP.
pub fn parse_transaction(hex_tx: &str) -> Result<EvmTransaction, PolicyError> {
    let trimmed = hex_tx.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let raw = hex::decode(digits).map_err(|e| ParseError::invalid_hex(e.to_string()))?;
    Ok(decode_unsigned(&raw)?)
}

/// Decode raw unsigned EIP-1559 bytes.
///
/// # Errors
///
/// Returns [`ParseError`] if the payload is not a nine-field EIP-1559 list.
pub fn decode_unsigned(raw: &[u8]) -> Result<EvmTransaction, ParseError> {
    let payload = eip1559_payload(raw)?;
    let items = decode_list(payload)?;

    if items.len() != UNSIGNED_FIELD_COUNT {
        return Err(ParseError::malformed_transaction(format!(
            "unsigned EIP-1559 transaction expected {UNSIGNED_FIELD_COUNT} items, got {}",
            items.len()
        )));
    }

    let field = |i: usize, name: &str| {
        items
            .get(i)
            .copied()
            .ok_or_else(|| ParseError::malformed_transaction(format!("missing {name} field")))
    };

    let chain_id = decode_u64(field(0, "chainId")?)?;
    let nonce = decode_u64(field(1, "nonce")?)?;
    let max_priority_fee_per_gas = decode_u256(field(2, "maxPriorityFeePerGas")?)?;
    let max_fee_per_gas = decode_u256(field(3, "maxFeePerGas")?)?;
    let gas_limit = decode_u64(field(4, "gasLimit")?)?;
    let to = decode_optional_address(field(5, "to")?)?;
    let value = decode_u256(field(6, "value")?)?;
    let data = decode_bytes(field(7, "data")?)?;

    let mut access_list_buf = field(8, "accessList")?;
    let access_list = AccessList::decode(&mut access_list_buf)
        .map_err(|e| ParseError::invalid_rlp(format!("failed to decode access list: {e}")))?;

    // The hash commits to the envelope byte whether or not the caller sent it.
    let mut prefixed = Vec::with_capacity(payload.len() + 1);
    prefixed.push(EIP1559_TX_TYPE);
    prefixed.extend_from_slice(payload);

    Ok(EvmTransaction {
        chain_id,
        nonce,
        max_priority_fee_per_gas,
        max_fee_per_gas,
        gas_limit,
        to,
        value,
        data,
        access_list,
        signing_hash: keccak256(&prefixed),
    })
}

/// One ECDSA signature as produced by the signing ceremony.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxSignature {
    /// `r` component.
    pub r: U256,
    /// `s` component.
    pub s: U256,
    /// Recovery id: `0`/`1`, or legacy `27`/`28`.
    pub recovery_id: u8,
}

impl TxSignature {
    /// Parse 65 bytes laid out as `r || s || v`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::MalformedInput`] for any other length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PolicyError> {
        if bytes.len() != 65 {
            return Err(PolicyError::malformed(format!(
                "signature must be 65 bytes, got {}",
                bytes.len()
            )));
        }
        let (r, rest) = bytes.split_at(32);
        let (s, v) = rest.split_at(32);
        Ok(Self {
            r: U256::from_be_slice(r),
            s: U256::from_be_slice(s),
            recovery_id: v.first().copied().unwrap_or_default(),
        })
    }

    fn y_parity(self) -> Result<bool, PolicyError> {
        match self.recovery_id {
            0 | 27 => Ok(false),
            1 | 28 => Ok(true),
            other => Err(PolicyError::malformed(format!(
                "invalid recovery id {other}"
            ))),
        }
    }
}

/// Hash of the signed transaction that `signatures` turn `unsigned` into.
///
/// Exactly one signature is required, and the payload's chain id must equal
/// `expected_chain_id`.
///
/// # Errors
///
/// Returns [`PolicyError::StructuralViolation`] for a signature count other
/// than one or a chain id mismatch, and [`PolicyError::MalformedInput`] for
/// undecodable input.
pub fn compute_tx_hash(
    unsigned: &[u8],
    expected_chain_id: u64,
    signatures: &[TxSignature],
) -> Result<B256, PolicyError> {
    let [signature] = signatures else {
        return Err(PolicyError::structural(format!(
            "expected exactly one signature, got {}",
            signatures.len()
        )));
    };

    let tx = decode_unsigned(unsigned)?;
    if tx.chain_id != expected_chain_id {
        return Err(PolicyError::structural(format!(
            "transaction chain id {} does not match {expected_chain_id}",
            tx.chain_id
        )));
    }

    let fee = |v: U256, name: &str| {
        u128::try_from(v).map_err(|_| PolicyError::malformed(format!("{name} overflows u128")))
    };

    let consensus_tx = TxEip1559 {
        chain_id: tx.chain_id,
        nonce: tx.nonce,
        gas_limit: tx.gas_limit,
        max_fee_per_gas: fee(tx.max_fee_per_gas, "maxFeePerGas")?,
        max_priority_fee_per_gas: fee(tx.max_priority_fee_per_gas, "maxPriorityFeePerGas")?,
        to: tx.to.map_or(TxKind::Create, TxKind::Call),
        value: tx.value,
        access_list: tx.access_list,
        input: Bytes::from(tx.data),
    };

    let sig = Signature::new(signature.r, signature.s, signature.y_parity()?);

    let mut buf = vec![EIP1559_TX_TYPE];
    consensus_tx.rlp_encode_signed(&sig, &mut buf);
    Ok(keccak256(&buf))
}
