//! ERC-20 call data decoding and the token protocol.
//!
//! | Function | Selector | Parameters |
//! |----------|----------|------------|
//! | `transfer(address,uint256)` | `0xa9059cbb` | `recipient`, `amount` |
//! | `approve(address,uint256)` | `0x095ea7b3` | `spender`, `amount` |
//! | `transferFrom(address,address,uint256)` | `0x23b872dd` | `sender`, `recipient`, `amount` |
//!
//! Decoding is strict: a known selector must be followed by exactly the
//! expected number of 32-byte words, and address words must be left-padded
//! with zeros. The same decoder backs TRC-20 on Tron.
//!
//! ```rust
//! use alloy_primitives::hex;
//! use txrule_chain::evm::erc20::{decode_erc20_call, Erc20Call};
//!
//! let calldata = hex::decode(
//!     "a9059cbb\
//!      0000000000000000000000001234567890123456789012345678901234567890\
//!      00000000000000000000000000000000000000000000000000000000000f4240",
//! )
//! .unwrap();
//!
//! let call = decode_erc20_call(&calldata).unwrap();
//! assert!(matches!(call, Some(Erc20Call::Transfer { .. })));
//! ```

use alloy_primitives::{Address, U256};
use txrule_core::error::ParseError;
use txrule_core::{
    assert_arg, assert_target, reject_unknown_parameters, require_constraint, ArgContext,
    BigIntCompare, PolicyError,
};

use super::protocol::{ensure_no_value, EvmAddressCompare, EvmProtocol, PolicyMatcher};
use super::transaction::EvmTransaction;

/// `keccak256("transfer(address,uint256)")[..4]`.
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// `keccak256("approve(address,uint256)")[..4]`.
pub const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

/// `keccak256("transferFrom(address,address,uint256)")[..4]`.
pub const TRANSFER_FROM_SELECTOR: [u8; 4] = [0x23, 0xb8, 0x72, 0xdd];

/// Selector plus two words.
pub const TWO_PARAM_LENGTH: usize = 68;

/// Selector plus three words.
pub const THREE_PARAM_LENGTH: usize = 100;

/// A decoded ERC-20 call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Erc20Call {
    /// `transfer(to, amount)`.
    Transfer {
        /// Recipient.
        to: Address,
        /// Token amount in base units.
        amount: U256,
    },
    /// `approve(spender, amount)`.
    Approve {
        /// Approved spender.
        spender: Address,
        /// Allowance in base units.
        amount: U256,
    },
    /// `transferFrom(from, to, amount)`.
    TransferFrom {
        /// Token owner.
        from: Address,
        /// Recipient.
        to: Address,
        /// Token amount in base units.
        amount: U256,
    },
}

impl Erc20Call {
    /// The function name as it appears in resource strings (lower case).
    #[must_use]
    pub const fn function_id(&self) -> &'static str {
        match self {
            Self::Transfer { .. } => "transfer",
            Self::Approve { .. } => "approve",
            Self::TransferFrom { .. } => "transferfrom",
        }
    }

    /// Parameter names this call exposes.
    #[must_use]
    pub const fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            Self::Transfer { .. } => &["recipient", "amount"],
            Self::Approve { .. } => &["spender", "amount"],
            Self::TransferFrom { .. } => &["sender", "recipient", "amount"],
        }
    }

    /// The token amount.
    #[must_use]
    pub const fn amount(&self) -> U256 {
        match self {
            Self::Transfer { amount, .. }
            | Self::Approve { amount, .. }
            | Self::TransferFrom { amount, .. } => *amount,
        }
    }
}

/// Decode ERC-20 call data.
///
/// Returns `Ok(None)` when the selector is not an ERC-20 selector.
///
/// # Errors
///
/// Returns [`ParseError::MalformedCalldata`] for a known selector with the
/// wrong length or a dirty address word.
pub fn decode_erc20_call(data: &[u8]) -> Result<Option<Erc20Call>, ParseError> {
    let Some(selector) = data.get(..4) else {
        return Ok(None);
    };

    let call = match <[u8; 4]>::try_from(selector).unwrap_or_default() {
        TRANSFER_SELECTOR => {
            expect_length(data, TWO_PARAM_LENGTH)?;
            Erc20Call::Transfer {
                to: word_address(data, 0)?,
                amount: word_u256(data, 1)?,
            }
        }
        APPROVE_SELECTOR => {
            expect_length(data, TWO_PARAM_LENGTH)?;
            Erc20Call::Approve {
                spender: word_address(data, 0)?,
                amount: word_u256(data, 1)?,
            }
        }
        TRANSFER_FROM_SELECTOR => {
            expect_length(data, THREE_PARAM_LENGTH)?;
            Erc20Call::TransferFrom {
                from: word_address(data, 0)?,
                to: word_address(data, 1)?,
                amount: word_u256(data, 2)?,
            }
        }
        _ => return Ok(None),
    };

    Ok(Some(call))
}

fn expect_length(data: &[u8], expected: usize) -> Result<(), ParseError> {
    if data.len() == expected {
        Ok(())
    } else {
        Err(ParseError::malformed_calldata(format!(
            "expected {expected} bytes of call data, got {}",
            data.len()
        )))
    }
}

fn word(data: &[u8], index: usize) -> Result<&[u8], ParseError> {
    let start = 4 + index * 32;
    data.get(start..start + 32)
        .ok_or_else(|| ParseError::malformed_calldata(format!("missing word {index}")))
}

/// Address in the low 20 bytes of a word; the high 12 bytes must be zero.
pub(crate) fn word_address(data: &[u8], index: usize) -> Result<Address, ParseError> {
    let w = word(data, index)?;
    let (padding, addr) = w.split_at(12);
    if padding.iter().any(|b| *b != 0) {
        return Err(ParseError::malformed_calldata(format!(
            "word {index} is not a left-padded address"
        )));
    }
    Ok(Address::from_slice(addr))
}

pub(crate) fn word_u256(data: &[u8], index: usize) -> Result<U256, ParseError> {
    Ok(U256::from_be_slice(word(data, index)?))
}

/// Generic ERC-20 protocol bound to one token contract.
#[derive(Debug, Clone)]
pub struct Erc20Protocol {
    symbol: String,
    contract: Address,
}

impl Erc20Protocol {
    /// Protocol for the token `symbol` deployed at `contract`.
    #[must_use]
    pub fn new(symbol: impl Into<String>, contract: Address) -> Self {
        Self {
            symbol: symbol.into(),
            contract,
        }
    }

    /// The token contract address.
    #[must_use]
    pub const fn contract(&self) -> Address {
        self.contract
    }
}

impl EvmProtocol for Erc20Protocol {
    fn id(&self) -> &str {
        &self.symbol
    }

    fn match_function_call(
        &self,
        ctx: &ArgContext<'_>,
        matcher: &PolicyMatcher<'_>,
        tx: &EvmTransaction,
    ) -> Result<bool, PolicyError> {
        let resource = matcher.resource()?;
        let function = resource.function_id.to_ascii_lowercase();
        let names: &[&str] = match function.as_str() {
            "transfer" => &["recipient", "amount"],
            "approve" => &["spender", "amount"],
            "transferfrom" => &["sender", "recipient", "amount"],
            _ => {
                return Err(PolicyError::unsupported(format!(
                    "token {} has no function {}",
                    self.symbol, resource.function_id
                )))
            }
        };
        reject_unknown_parameters(matcher.constraints, names)?;
        for name in names {
            require_constraint(matcher.constraints, name)?;
        }

        if tx.to != Some(self.contract) {
            return Ok(false);
        }
        let Some(call) = decode_erc20_call(&tx.data)? else {
            return Ok(false);
        };
        if call.function_id() != function {
            return Ok(false);
        }

        ensure_no_value(tx.value, "token call")?;
        assert_target(ctx, matcher.target, &self.contract, EvmAddressCompare::boxed)?;

        let cs = matcher.constraints;
        match call {
            Erc20Call::Transfer { to, amount } => {
                assert_arg(ctx, cs, "recipient", &to, EvmAddressCompare::boxed)?;
                assert_arg(ctx, cs, "amount", &amount, BigIntCompare::boxed)?;
            }
            Erc20Call::Approve { spender, amount } => {
                assert_arg(ctx, cs, "spender", &spender, EvmAddressCompare::boxed)?;
                assert_arg(ctx, cs, "amount", &amount, BigIntCompare::boxed)?;
            }
            Erc20Call::TransferFrom { from, to, amount } => {
                assert_arg(ctx, cs, "sender", &from, EvmAddressCompare::boxed)?;
                assert_arg(ctx, cs, "recipient", &to, EvmAddressCompare::boxed)?;
                assert_arg(ctx, cs, "amount", &amount, BigIntCompare::boxed)?;
            }
        }

        Ok(true)
    }
}
