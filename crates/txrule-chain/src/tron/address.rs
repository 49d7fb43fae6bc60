//! TRON base58check addresses.
//!
//! A raw TRON address is 21 bytes: the `0x41` version byte followed by the
//! 20-byte account hash. The text form is base58check of those 21 bytes with a
//! double-SHA-256 checksum. The version byte is part of the input, so encoding
//! never prepends one.

use txrule_core::error::ParseError;

/// Version byte of mainnet TRON addresses.
pub const TRON_ADDRESS_PREFIX: u8 = 0x41;

/// Length of a raw address including the version byte.
pub const TRON_ADDRESS_LEN: usize = 21;

/// Encode a raw 21-byte address.
///
/// # Errors
///
/// Returns [`ParseError::InvalidAddress`] unless `raw` is 21 bytes starting
/// with `0x41`.
pub fn encode_address(raw: &[u8]) -> Result<String, ParseError> {
    if raw.len() != TRON_ADDRESS_LEN || raw.first() != Some(&TRON_ADDRESS_PREFIX) {
        return Err(ParseError::invalid_address(hex::encode(raw)));
    }
    Ok(bs58::encode(raw).with_check().into_string())
}

/// Encode a 20-byte account hash (as found in TRC-20 call data).
#[must_use]
pub fn encode_account(hash: &[u8; 20]) -> String {
    let mut raw = [0u8; TRON_ADDRESS_LEN];
    raw[0] = TRON_ADDRESS_PREFIX;
    raw[1..].copy_from_slice(hash);
    bs58::encode(raw).with_check().into_string()
}

/// Decode a base58check address into its raw 21 bytes.
///
/// # Errors
///
/// Returns [`ParseError::InvalidAddress`] for bad text, a bad checksum, the
/// wrong length or the wrong version byte.
pub fn decode_address(address: &str) -> Result<[u8; TRON_ADDRESS_LEN], ParseError> {
    let raw = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|_| ParseError::invalid_address(address))?;
    let raw: [u8; TRON_ADDRESS_LEN] = raw
        .try_into()
        .map_err(|_| ParseError::invalid_address(address))?;
    if raw[0] != TRON_ADDRESS_PREFIX {
        return Err(ParseError::invalid_address(address));
    }
    Ok(raw)
}
