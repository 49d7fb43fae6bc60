//! Cosmos-SDK family engine (THORChain, MayaChain, Gaia).
//!
//! A transaction must carry exactly one message. The message type decides
//! which protocols may evaluate it:
//!
//! - `send` or the chain's native symbol: bank `MsgSend` only
//! - `<chain>_swap`: `MsgDeposit` only
//!
//! Swaps have no destination field; the destination lives in the memo, so
//! swap rules take no target and constrain `memo` instead.

pub mod proto;

use std::fmt;
use std::sync::Arc;

use alloy_primitives::U256;
use bech32::{Bech32, Hrp};
use prost::Message;
use txrule_core::config::DEFAULT_MAX_TX_BYTES;
use txrule_core::error::ParseError;
use txrule_core::{
    assert_arg, assert_str_arg, assert_target, reject_unknown_parameters, require_constraint,
    ArgContext, BigIntCompare, MagicConstantResolver, PolicyError, Rule, StringCompare,
};

use crate::engine::{check_size, prepare, Engine};

use proto::{BankMsgSend, MsgDeposit, NativeMsgSend, Tx};

/// `type_url` of the bank send message.
pub const BANK_MSG_SEND: &str = "/cosmos.bank.v1beta1.MsgSend";

/// `type_url` of the THORChain / MayaChain native send.
pub const NATIVE_MSG_SEND: &str = "/types.MsgSend";

/// `type_url` of the THORChain / MayaChain deposit.
pub const MSG_DEPOSIT: &str = "/types.MsgDeposit";

const SEND_PARAMS: [&str; 4] = ["recipient", "amount", "denom", "memo"];
const SWAP_PARAMS: [&str; 3] = ["amount", "from_asset", "memo"];

/// Static parameters of one Cosmos-SDK chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CosmosParams {
    /// Chain id in resource strings.
    pub id: &'static str,
    /// Bech32 human-readable part of account addresses.
    pub hrp: &'static str,
    /// Native asset symbol, usable as a protocol id.
    pub native_symbol: &'static str,
    /// Bank denomination of the native asset.
    pub native_denom: &'static str,
    /// Protocol id of in-protocol swaps, if the chain has `MsgDeposit`.
    pub swap_protocol: Option<&'static str>,
}

impl CosmosParams {
    /// THORChain mainnet.
    pub const THORCHAIN: Self = Self {
        id: "thorchain",
        hrp: "thor",
        native_symbol: "rune",
        native_denom: "rune",
        swap_protocol: Some("thorchain_swap"),
    };

    /// MayaChain mainnet.
    pub const MAYACHAIN: Self = Self {
        id: "mayachain",
        hrp: "maya",
        native_symbol: "cacao",
        native_denom: "cacao",
        swap_protocol: Some("mayachain_swap"),
    };

    /// Cosmos Hub.
    pub const GAIA: Self = Self {
        id: "gaia",
        hrp: "cosmos",
        native_symbol: "atom",
        native_denom: "uatom",
        swap_protocol: None,
    };
}

/// The single message of a transaction, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CosmosMessage {
    /// A bank transfer.
    Send {
        /// Recipient, bech32.
        to_address: String,
        /// Amount of the single coin.
        amount: U256,
        /// Denomination of the single coin.
        denom: String,
    },
    /// An in-protocol deposit (swap).
    Deposit {
        /// Amount of the single coin.
        amount: U256,
        /// Deposited asset, upper-case notation.
        from_asset: String,
    },
}

/// A decoded transaction: its one message and its memo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CosmosTx {
    /// The message.
    pub message: CosmosMessage,
    /// `TxBody.memo`, or the deposit memo for `MsgDeposit`.
    pub memo: String,
}

/// Coin amounts are non-empty runs of ASCII digits.
fn parse_amount(raw: &str) -> Result<U256, ParseError> {
    let invalid = || ParseError::malformed_transaction(format!("invalid coin amount {raw:?}"));
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    U256::from_str_radix(raw, 10).map_err(|_| invalid())
}

fn single<'a, T>(items: &'a [T], what: &str) -> Result<&'a T, PolicyError> {
    match items {
        [one] => Ok(one),
        _ => Err(PolicyError::structural(format!(
            "expected exactly one {what}, got {}",
            items.len()
        ))),
    }
}

/// Decode a transaction and its single message.
///
/// # Errors
///
/// Returns [`PolicyError::MalformedInput`] for undecodable bytes,
/// [`PolicyError::StructuralViolation`] for a message or coin count other
/// than one, and [`PolicyError::UnsupportedProtocol`] for unknown message
/// types.
pub fn decode_tx(params: &CosmosParams, raw: &[u8]) -> Result<CosmosTx, PolicyError> {
    let tx = Tx::decode(raw).map_err(|e| ParseError::invalid_protobuf(e.to_string()))?;
    let body = tx
        .body
        .ok_or_else(|| PolicyError::structural("transaction has no body"))?;
    let any = single(&body.messages, "message")?;

    let decode_err = |e: prost::DecodeError| ParseError::invalid_protobuf(e.to_string());
    match any.type_url.as_str() {
        BANK_MSG_SEND => {
            let msg = BankMsgSend::decode(any.value.as_slice()).map_err(decode_err)?;
            let coin = single(&msg.amount, "coin")?;
            Ok(CosmosTx {
                message: CosmosMessage::Send {
                    to_address: msg.to_address,
                    amount: parse_amount(&coin.amount)?,
                    denom: coin.denom.clone(),
                },
                memo: body.memo,
            })
        }
        NATIVE_MSG_SEND if params.swap_protocol.is_some() => {
            let msg = NativeMsgSend::decode(any.value.as_slice()).map_err(decode_err)?;
            let coin = single(&msg.amount, "coin")?;
            let hrp = Hrp::parse(params.hrp)
                .map_err(|e| PolicyError::malformed(format!("bad hrp {}: {e}", params.hrp)))?;
            let to_address = bech32::encode::<Bech32>(hrp, &msg.to_address)
                .map_err(|e| ParseError::invalid_address(format!("{e}")))?;
            Ok(CosmosTx {
                message: CosmosMessage::Send {
                    to_address,
                    amount: parse_amount(&coin.amount)?,
                    denom: coin.denom.clone(),
                },
                memo: body.memo,
            })
        }
        MSG_DEPOSIT if params.swap_protocol.is_some() => {
            let msg = MsgDeposit::decode(any.value.as_slice()).map_err(decode_err)?;
            let coin = single(&msg.coins, "coin")?;
            let asset = coin
                .asset
                .as_ref()
                .ok_or_else(|| PolicyError::structural("deposit coin has no asset"))?;
            Ok(CosmosTx {
                message: CosmosMessage::Deposit {
                    amount: parse_amount(&coin.amount)?,
                    from_asset: asset.notation(),
                },
                memo: msg.memo,
            })
        }
        other => Err(PolicyError::unsupported(format!(
            "message type {other} is not supported on {}",
            params.id
        ))),
    }
}

/// Which message kind a protocol id admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// `send`: any denom.
    Send,
    /// Native symbol: native denom only.
    Native,
    /// `<chain>_swap`.
    Swap,
}

/// Engine for one Cosmos-SDK chain.
#[derive(Clone)]
pub struct CosmosChain {
    params: CosmosParams,
    max_tx_bytes: usize,
    resolver: Arc<dyn MagicConstantResolver>,
}

impl fmt::Debug for CosmosChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosmosChain")
            .field("params", &self.params)
            .field("max_tx_bytes", &self.max_tx_bytes)
            .finish_non_exhaustive()
    }
}

impl CosmosChain {
    /// Engine for `params` with the default 32 KiB size cap.
    #[must_use]
    pub fn new(params: CosmosParams, resolver: Arc<dyn MagicConstantResolver>) -> Self {
        Self {
            params,
            max_tx_bytes: DEFAULT_MAX_TX_BYTES,
            resolver,
        }
    }

    /// Override the size cap.
    #[must_use]
    pub const fn with_max_tx_bytes(mut self, max: usize) -> Self {
        self.max_tx_bytes = max;
        self
    }

    /// Static chain parameters.
    #[must_use]
    pub const fn params(&self) -> &CosmosParams {
        &self.params
    }

    fn route(&self, protocol: &str, function: &str) -> Result<Route, PolicyError> {
        let (route, expected_fn) = if protocol.eq_ignore_ascii_case("send") {
            (Route::Send, "transfer")
        } else if protocol.eq_ignore_ascii_case(self.params.native_symbol) {
            (Route::Native, "transfer")
        } else if self
            .params
            .swap_protocol
            .is_some_and(|p| protocol.eq_ignore_ascii_case(p))
        {
            (Route::Swap, "swap")
        } else {
            return Err(PolicyError::unsupported(format!(
                "protocol {protocol} is not supported on {}",
                self.params.id
            )));
        };
        if !function.eq_ignore_ascii_case(expected_fn) {
            return Err(PolicyError::unsupported(format!(
                "function {function} is not supported by {protocol}"
            )));
        }
        Ok(route)
    }

    fn evaluate_inner(&self, rule: &Rule, route: Route, tx: &[u8]) -> Result<(), PolicyError> {
        let constraints = &rule.parameter_constraints;
        match route {
            Route::Send | Route::Native => {
                reject_unknown_parameters(constraints, &SEND_PARAMS)?;
                require_constraint(constraints, "recipient")?;
                require_constraint(constraints, "amount")?;
            }
            Route::Swap => {
                if !rule.target.is_unspecified() {
                    return Err(PolicyError::rule_shape(
                        "swap rules take no target; constrain the memo instead",
                    ));
                }
                reject_unknown_parameters(constraints, &SWAP_PARAMS)?;
                require_constraint(constraints, "amount")?;
                require_constraint(constraints, "memo")?;
            }
        }

        check_size(tx, self.max_tx_bytes)?;
        let decoded = decode_tx(&self.params, tx)?;
        let ctx = ArgContext::new(self.params.id, self.resolver.as_ref());

        match (&decoded.message, route) {
            (
                CosmosMessage::Send {
                    to_address,
                    amount,
                    denom,
                },
                Route::Send | Route::Native,
            ) => {
                if route == Route::Native && denom != self.params.native_denom {
                    return Err(PolicyError::structural(format!(
                        "{} transfer moves {denom}",
                        self.params.native_symbol
                    )));
                }
                let to_address = to_address.as_str();
                assert_target(&ctx, &rule.target, to_address, StringCompare::boxed)?;
                assert_arg(&ctx, constraints, "recipient", to_address, StringCompare::boxed)?;
                assert_arg(&ctx, constraints, "amount", amount, BigIntCompare::boxed)?;
                assert_str_arg(&ctx, constraints, "denom", denom, StringCompare::boxed)?;
            }
            (CosmosMessage::Deposit { amount, from_asset }, Route::Swap) => {
                assert_arg(&ctx, constraints, "amount", amount, BigIntCompare::boxed)?;
                assert_str_arg(&ctx, constraints, "from_asset", from_asset, StringCompare::boxed)?;
            }
            (message, _) => {
                return Err(PolicyError::structural(format!(
                    "{} message cannot be evaluated under {route:?} rules",
                    match message {
                        CosmosMessage::Send { .. } => "send",
                        CosmosMessage::Deposit { .. } => "deposit",
                    }
                )));
            }
        }
        assert_str_arg(&ctx, constraints, "memo", &decoded.memo, StringCompare::boxed)?;
        Ok(())
    }
}

impl Engine for CosmosChain {
    fn id(&self) -> &str {
        self.params.id
    }

    fn evaluate(&self, rule: &Rule, tx: &[u8]) -> Result<(), PolicyError> {
        let path = prepare(rule, self.params.id)?;
        tracing::debug!(chain = self.params.id, resource = %path, "evaluating Cosmos rule");

        let outcome = self
            .route(&path.protocol_id, &path.function_id)
            .and_then(|route| self.evaluate_inner(rule, route, tx));
        if let Err(e) = &outcome {
            tracing::warn!(chain = self.params.id, resource = %path, error = %e, "rule denied");
        }
        outcome
    }
}
