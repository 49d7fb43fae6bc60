//! RLP helpers over `alloy-rlp` with [`ParseError`] reporting.
//!
//! Only what the unsigned EIP-1559 decoder needs: stripping the typed
//! envelope, splitting the field list, and decoding scalar fields.

use alloy_primitives::{Address, U256};
use alloy_rlp::{Decodable, Header, PayloadView};
use txrule_core::error::{ParseError, ParseResult};

/// EIP-2718 type byte of a dynamic-fee transaction.
pub const EIP1559_TX_TYPE: u8 = 0x02;

/// Strip the `0x02` envelope byte if present.
///
/// An unsigned payload may be supplied with or without the type byte; any other
/// type byte is rejected.
///
/// # Errors
///
/// Returns [`ParseError::MalformedTransaction`] for empty input or a non
/// EIP-1559 type byte.
pub fn eip1559_payload(data: &[u8]) -> ParseResult<&[u8]> {
    match data.first() {
        None => Err(ParseError::malformed_transaction("empty transaction data")),
        Some(&EIP1559_TX_TYPE) => Ok(data.get(1..).unwrap_or_default()),
        Some(&b) if b >= 0xc0 => Ok(data),
        Some(&b) => Err(ParseError::malformed_transaction(format!(
            "unsupported transaction type 0x{b:02x}, expected EIP-1559"
        ))),
    }
}

/// Split an RLP list into its encoded items.
///
/// Trailing bytes after the list are rejected.
///
/// # Errors
///
/// Returns [`ParseError::InvalidRlp`] if `data` is not exactly one RLP list.
pub fn decode_list(data: &[u8]) -> ParseResult<Vec<&[u8]>> {
    let mut buf = data;
    let payload = Header::decode_raw(&mut buf)
        .map_err(|e| ParseError::invalid_rlp(format!("failed to decode list: {e}")))?;
    if !buf.is_empty() {
        return Err(ParseError::invalid_rlp(format!(
            "{} trailing bytes after list",
            buf.len()
        )));
    }

    match payload {
        PayloadView::List(items) => Ok(items),
        PayloadView::String(_) => Err(ParseError::invalid_rlp("expected list, found string")),
    }
}

/// Decode an RLP byte string.
///
/// # Errors
///
/// Returns [`ParseError::InvalidRlp`] on malformed input.
pub fn decode_bytes(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut buf = data;
    let bytes = Header::decode_bytes(&mut buf, false)
        .map_err(|e| ParseError::invalid_rlp(format!("failed to decode bytes: {e}")))?;
    Ok(bytes.to_vec())
}

/// Decode a 256-bit unsigned integer.
///
/// # Errors
///
/// Returns [`ParseError::InvalidRlp`] on malformed input.
pub fn decode_u256(data: &[u8]) -> ParseResult<U256> {
    let mut buf = data;
    U256::decode(&mut buf)
        .map_err(|e| ParseError::invalid_rlp(format!("failed to decode U256: {e}")))
}

/// Decode a 64-bit unsigned integer.
///
/// # Errors
///
/// Returns [`ParseError::InvalidRlp`] on malformed input or overflow.
pub fn decode_u64(data: &[u8]) -> ParseResult<u64> {
    let mut buf = data;
    u64::decode(&mut buf).map_err(|e| ParseError::invalid_rlp(format!("failed to decode u64: {e}")))
}

/// Decode a 20-byte address; the empty string (`0x80`) means contract creation.
///
/// # Errors
///
/// Returns [`ParseError::InvalidRlp`] on malformed input.
pub fn decode_optional_address(data: &[u8]) -> ParseResult<Option<Address>> {
    if data == [0x80] {
        return Ok(None);
    }

    let mut buf = data;
    Address::decode(&mut buf)
        .map(Some)
        .map_err(|e| ParseError::invalid_rlp(format!("failed to decode address: {e}")))
}
