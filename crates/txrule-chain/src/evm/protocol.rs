//! EVM protocol abstraction and the native-currency transfer protocol.
//!
//! A protocol answers one question: does this transaction call the function
//! the rule is scoped to, and if so, do its parameters satisfy the rule?
//!
//! - `Ok(false)`: the transaction is not this kind of call (non-match)
//! - `Ok(true)`: it is, and every check passed
//! - `Err(_)`: it is, but a check failed, or the rule is unusable

use std::fmt;

use alloy_primitives::{Address, U256};
use txrule_core::{
    assert_arg, assert_str_arg, assert_target, reject_unknown_parameters, require_constraint,
    ArgContext, BigIntCompare, Compare, ParameterConstraint, PolicyError, ResourcePath,
    StringCompare, Target, UintCompare,
};

use super::transaction::EvmTransaction;

/// Comparator for 20-byte EVM addresses. Supports only `fixed` and `magic`.
#[derive(Debug, Clone, Copy)]
pub struct EvmAddressCompare {
    value: Address,
}

impl EvmAddressCompare {
    /// Build from a hex address literal (any case).
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::ConstraintViolation`] for a malformed address.
    pub fn boxed(raw: &str) -> Result<Box<dyn Compare<Address>>, PolicyError> {
        let value: Address = raw.trim().parse().map_err(|e| {
            PolicyError::constraint(
                "<address literal>",
                "valid EVM address",
                format!("{raw:?} ({e})"),
            )
        })?;
        Ok(Box::new(Self { value }))
    }
}

impl Compare<Address> for EvmAddressCompare {
    fn fixed(&self, actual: &Address) -> bool {
        *actual == self.value
    }

    fn magic(&self, actual: &Address) -> bool {
        *actual == self.value
    }
}

/// The rule fields a protocol matches against.
#[derive(Debug, Clone, Copy)]
pub struct PolicyMatcher<'a> {
    /// Parsed resource; `None` is a caller error.
    pub resource: Option<&'a ResourcePath>,
    /// Required destination.
    pub target: &'a Target,
    /// Parameter constraints.
    pub constraints: &'a [ParameterConstraint],
}

impl<'a> PolicyMatcher<'a> {
    /// The resource path, or a rule-shape error when unset.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::RuleShape`] if no resource was supplied.
    pub fn resource(&self) -> Result<&'a ResourcePath, PolicyError> {
        self.resource
            .ok_or_else(|| PolicyError::rule_shape("policy matcher has no resource path"))
    }
}

/// A callable surface on an EVM chain: the native coin, a token, or a contract.
pub trait EvmProtocol: Send + Sync + fmt::Debug {
    /// Protocol id as used in resource strings.
    fn id(&self) -> &str;

    /// Match `tx` against the rule described by `matcher`.
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyError`] when the transaction is the described call but
    /// fails a check, or when the rule cannot be evaluated.
    fn match_function_call(
        &self,
        ctx: &ArgContext<'_>,
        matcher: &PolicyMatcher<'_>,
        tx: &EvmTransaction,
    ) -> Result<bool, PolicyError>;
}

/// Bare value transfer of the chain's native currency.
#[derive(Debug, Clone)]
pub struct NativeProtocol {
    symbol: String,
    chain_id: u64,
}

const NATIVE_PARAMS: [&str; 4] = ["recipient", "amount", "chainId", "asset"];

impl NativeProtocol {
    /// Native protocol for `symbol` on numeric chain `chain_id`.
    #[must_use]
    pub fn new(symbol: impl Into<String>, chain_id: u64) -> Self {
        Self {
            symbol: symbol.into(),
            chain_id,
        }
    }

    /// The native currency symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl EvmProtocol for NativeProtocol {
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
        if !resource.function_id.eq_ignore_ascii_case("transfer") {
            return Err(PolicyError::unsupported(format!(
                "native protocol {} has no function {}",
                self.symbol, resource.function_id
            )));
        }

        reject_unknown_parameters(matcher.constraints, &NATIVE_PARAMS)?;
        require_constraint(matcher.constraints, "recipient")?;
        require_constraint(matcher.constraints, "amount")?;

        // Any call data means this is not a bare value transfer.
        if !tx.data.is_empty() {
            return Ok(false);
        }
        let Some(to) = tx.to else {
            return Ok(false);
        };

        assert_target(ctx, matcher.target, &to, EvmAddressCompare::boxed)?;

        let recipient = to.to_string().to_ascii_lowercase();
        assert_str_arg(ctx, matcher.constraints, "recipient", &recipient, StringCompare::boxed)?;
        assert_arg(ctx, matcher.constraints, "amount", &tx.value, BigIntCompare::boxed)?;
        assert_arg(
            ctx,
            matcher.constraints,
            "chainId",
            &self.chain_id,
            UintCompare::<u64>::boxed,
        )?;
        assert_str_arg(ctx, matcher.constraints, "asset", &self.symbol, StringCompare::boxed)?;

        Ok(true)
    }
}

/// Reject token and contract calls that also move the native coin.
pub(crate) fn ensure_no_value(value: U256, what: &str) -> Result<(), PolicyError> {
    if value.is_zero() {
        Ok(())
    } else {
        Err(PolicyError::structural(format!(
            "{what} carries a native value of {value}"
        )))
    }
}
