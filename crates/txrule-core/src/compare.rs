//! Typed comparators behind Fixed, Min, Max and Magic constraints.
//!
//! Every comparator is built from the constraint's textual literal by a
//! [`CompareCtor`] and answers the four matching operations against a value
//! extracted from a transaction. Operations a type does not support answer
//! `false`, so a nonsensical `Min` on an address fails closed.
//!
//! ```rust
//! use txrule_core::compare::{BigIntCompare, Compare};
//! use txrule_core::U256;
//!
//! let cmp = BigIntCompare::new("1000000").unwrap();
//! assert!(cmp.fixed(&U256::from(1_000_000u64)));
//! assert!(cmp.min(&U256::from(2_000_000u64)));
//! assert!(!cmp.max(&U256::from(2_000_000u64)));
//! ```

use std::fmt::{self, Display};
use std::str::FromStr;

use alloy_primitives::{Bytes, FixedBytes, I256, U256};
use base64::Engine;

use crate::error::PolicyError;

/// Matching operations for one value kind.
///
/// `min` passes when the actual value is greater than or equal to the literal,
/// `max` when it is less than or equal. `magic` compares against a literal that
/// came from the magic constant resolver.
pub trait Compare<T: ?Sized>: Send + Sync {
    /// Exact equality with the literal.
    fn fixed(&self, _actual: &T) -> bool {
        false
    }

    /// Lower bound.
    fn min(&self, _actual: &T) -> bool {
        false
    }

    /// Upper bound.
    fn max(&self, _actual: &T) -> bool {
        false
    }

    /// Equality with a resolved magic constant.
    fn magic(&self, _actual: &T) -> bool {
        false
    }
}

/// Builds a comparator from a constraint literal.
pub type CompareCtor<T> = fn(&str) -> Result<Box<dyn Compare<T>>, PolicyError>;

fn bad_literal(kind: &str, raw: &str, reason: impl Display) -> PolicyError {
    PolicyError::constraint(
        format!("<{kind} literal>"),
        format!("valid {kind}"),
        format!("{raw:?} ({reason})"),
    )
}

// ============================================================================
// Integers
// ============================================================================

/// Arbitrary 256-bit unsigned integer comparator.
///
/// Accepts decimal literals and `0x`-prefixed hex.
#[derive(Debug, Clone)]
pub struct BigIntCompare {
    value: U256,
}

impl BigIntCompare {
    /// Parse a literal.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::ConstraintViolation`] when the literal is not a
    /// 256-bit unsigned integer.
    pub fn new(raw: &str) -> Result<Self, PolicyError> {
        let value = U256::from_str(raw.trim()).map_err(|e| bad_literal("uint256", raw, e))?;
        Ok(Self { value })
    }

    /// [`CompareCtor`] for [`U256`].
    ///
    /// # Errors
    ///
    /// See [`BigIntCompare::new`].
    pub fn boxed(raw: &str) -> Result<Box<dyn Compare<U256>>, PolicyError> {
        Ok(Box::new(Self::new(raw)?))
    }
}

impl Compare<U256> for BigIntCompare {
    fn fixed(&self, actual: &U256) -> bool {
        *actual == self.value
    }

    fn min(&self, actual: &U256) -> bool {
        *actual >= self.value
    }

    fn max(&self, actual: &U256) -> bool {
        *actual <= self.value
    }

    fn magic(&self, actual: &U256) -> bool {
        *actual == self.value
    }
}

/// Signed 256-bit integer comparator for ABI `int<N>` parameters.
#[derive(Debug, Clone)]
pub struct IntCompare {
    value: I256,
}

impl IntCompare {
    /// [`CompareCtor`] for [`I256`].
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::ConstraintViolation`] for a non-integer literal.
    pub fn boxed(raw: &str) -> Result<Box<dyn Compare<I256>>, PolicyError> {
        let value = I256::from_dec_str(raw.trim()).map_err(|e| bad_literal("int256", raw, e))?;
        Ok(Box::new(Self { value }))
    }
}

impl Compare<I256> for IntCompare {
    fn fixed(&self, actual: &I256) -> bool {
        *actual == self.value
    }

    fn min(&self, actual: &I256) -> bool {
        *actual >= self.value
    }

    fn max(&self, actual: &I256) -> bool {
        *actual <= self.value
    }

    fn magic(&self, actual: &I256) -> bool {
        *actual == self.value
    }
}

/// Fixed-width unsigned integer comparator.
///
/// The literal must parse at the exact width of `T`: `"256"` is rejected for
/// `u8` rather than truncated.
pub struct UintCompare<T> {
    value: T,
}

impl<T> UintCompare<T>
where
    T: FromStr + PartialOrd + Copy + Send + Sync + 'static,
    T::Err: Display,
{
    /// [`CompareCtor`] for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::ConstraintViolation`] if the literal does not
    /// fit in `T`.
    pub fn boxed(raw: &str) -> Result<Box<dyn Compare<T>>, PolicyError> {
        let value = raw
            .trim()
            .parse::<T>()
            .map_err(|e| bad_literal(std::any::type_name::<T>(), raw, e))?;
        Ok(Box::new(Self { value }))
    }
}

impl<T> Compare<T> for UintCompare<T>
where
    T: PartialOrd + Copy + Send + Sync,
{
    fn fixed(&self, actual: &T) -> bool {
        *actual == self.value
    }

    fn min(&self, actual: &T) -> bool {
        *actual >= self.value
    }

    fn max(&self, actual: &T) -> bool {
        *actual <= self.value
    }

    fn magic(&self, actual: &T) -> bool {
        *actual == self.value
    }
}

// ============================================================================
// Booleans and bytes
// ============================================================================

/// Boolean comparator. Only `fixed` and `magic` are meaningful.
#[derive(Debug, Clone, Copy)]
pub struct BoolCompare {
    value: bool,
}

impl BoolCompare {
    /// [`CompareCtor`] for `bool`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::ConstraintViolation`] unless the literal is
    /// `true` or `false`.
    pub fn boxed(raw: &str) -> Result<Box<dyn Compare<bool>>, PolicyError> {
        let value = raw
            .trim()
            .parse::<bool>()
            .map_err(|e| bad_literal("bool", raw, e))?;
        Ok(Box::new(Self { value }))
    }
}

impl Compare<bool> for BoolCompare {
    fn fixed(&self, actual: &bool) -> bool {
        *actual == self.value
    }

    fn magic(&self, actual: &bool) -> bool {
        *actual == self.value
    }
}

/// Dynamic byte string comparator; the literal is hex with optional `0x`.
#[derive(Debug, Clone)]
pub struct BytesCompare {
    value: Vec<u8>,
}

impl BytesCompare {
    /// [`CompareCtor`] for [`Bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::ConstraintViolation`] for invalid hex.
    pub fn boxed(raw: &str) -> Result<Box<dyn Compare<Bytes>>, PolicyError> {
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let value = hex::decode(digits).map_err(|e| bad_literal("hex bytes", raw, e))?;
        Ok(Box::new(Self { value }))
    }
}

impl Compare<Bytes> for BytesCompare {
    fn fixed(&self, actual: &Bytes) -> bool {
        actual.as_ref() == self.value.as_slice()
    }

    fn magic(&self, actual: &Bytes) -> bool {
        actual.as_ref() == self.value.as_slice()
    }
}

/// Fixed-size byte array comparator; the literal is standard base64.
#[derive(Debug, Clone)]
pub struct FixedBytesCompare<const N: usize> {
    value: FixedBytes<N>,
}

impl<const N: usize> FixedBytesCompare<N> {
    /// [`CompareCtor`] for [`FixedBytes<N>`].
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::ConstraintViolation`] for invalid base64 or a
    /// decoded length other than `N`.
    pub fn boxed(raw: &str) -> Result<Box<dyn Compare<FixedBytes<N>>>, PolicyError> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(raw.trim())
            .map_err(|e| bad_literal("base64", raw, e))?;
        if decoded.len() != N {
            return Err(bad_literal(
                "base64",
                raw,
                format!("decoded to {} bytes, expected {N}", decoded.len()),
            ));
        }
        Ok(Box::new(Self {
            value: FixedBytes::from_slice(&decoded),
        }))
    }
}

impl<const N: usize> Compare<FixedBytes<N>> for FixedBytesCompare<N> {
    fn fixed(&self, actual: &FixedBytes<N>) -> bool {
        *actual == self.value
    }

    fn magic(&self, actual: &FixedBytes<N>) -> bool {
        *actual == self.value
    }
}

// ============================================================================
// Strings
// ============================================================================

/// Case-insensitive string comparator for symbols, denoms and bech32 text.
#[derive(Debug, Clone)]
pub struct StringCompare {
    value: String,
}

impl StringCompare {
    /// [`CompareCtor`] for `str`. Never fails.
    ///
    /// # Errors
    ///
    /// Infallible; the signature matches [`CompareCtor`].
    pub fn boxed(raw: &str) -> Result<Box<dyn Compare<str>>, PolicyError> {
        Ok(Box::new(Self {
            value: raw.to_string(),
        }))
    }
}

impl Compare<str> for StringCompare {
    fn fixed(&self, actual: &str) -> bool {
        actual.eq_ignore_ascii_case(&self.value)
    }

    fn magic(&self, actual: &str) -> bool {
        actual.eq_ignore_ascii_case(&self.value)
    }
}

/// Case-sensitive string comparator for base58 text.
#[derive(Debug, Clone)]
pub struct ExactStringCompare {
    value: String,
}

impl ExactStringCompare {
    /// [`CompareCtor`] for `str`. Never fails.
    ///
    /// # Errors
    ///
    /// Infallible; the signature matches [`CompareCtor`].
    pub fn boxed(raw: &str) -> Result<Box<dyn Compare<str>>, PolicyError> {
        Ok(Box::new(Self {
            value: raw.to_string(),
        }))
    }
}

impl Compare<str> for ExactStringCompare {
    fn fixed(&self, actual: &str) -> bool {
        actual == self.value
    }

    fn magic(&self, actual: &str) -> bool {
        actual == self.value
    }
}

/// Renders a byte slice as `0x`-prefixed hex for error messages.
#[derive(Debug, Clone, Copy)]
pub struct HexDisplay<'a>(pub &'a [u8]);

impl Display for HexDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}
