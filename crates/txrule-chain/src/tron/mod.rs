//! TRON engine.
//!
//! Input is the protobuf `raw_data` of a transaction, never the signed
//! envelope. Exactly one contract is accepted, of one of two kinds:
//!
//! | Protocol | Contract | Parameters |
//! |----------|----------|------------|
//! | `trx` | `TransferContract` | `recipient`, `amount`, `memo` |
//! | `trc20` | `TriggerSmartContract`, `transfer(address,uint256)` | as `trx`, plus `from_asset` |
//!
//! The rule target, when set, is the TRX recipient or the TRC-20 contract.

pub mod address;
pub mod proto;

use std::sync::Arc;

use alloy_primitives::{B256, U256};
use sha2::{Digest, Sha256};
use txrule_core::config::DEFAULT_MAX_TX_BYTES;
use txrule_core::error::ParseError;
use txrule_core::{
    assert_arg, assert_str_arg, assert_target, reject_unknown_parameters, require_constraint,
    ArgContext, BigIntCompare, ExactStringCompare, MagicConstantResolver, PolicyError, Rule,
    StringCompare,
};

use crate::engine::{check_size, prepare, Engine};
use crate::evm::erc20::{decode_erc20_call, Erc20Call};

pub use address::{decode_address, encode_account, encode_address, TRON_ADDRESS_PREFIX};
pub use proto::{decode_raw_data, RawData, TRANSFER_CONTRACT, TRIGGER_SMART_CONTRACT};

/// Chain id in resource strings.
pub const TRON_CHAIN_ID: &str = "tron";

const TRX_PARAMS: [&str; 3] = ["recipient", "amount", "memo"];
const TRC20_PARAMS: [&str; 4] = ["recipient", "amount", "from_asset", "memo"];

/// Transaction id: SHA-256 of the exact `raw_data` bytes.
///
/// Signatures are accepted for interface symmetry with the EVM engine and
/// never read.
#[must_use]
pub fn compute_tx_hash<S: AsRef<[u8]>>(raw_data: &[u8], _signatures: &[S]) -> B256 {
    B256::from_slice(&Sha256::digest(raw_data))
}

/// The single contract of a transaction, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TronCall {
    Trx {
        recipient: String,
        amount: u64,
    },
    Trc20 {
        contract: String,
        recipient: String,
        amount: U256,
    },
}

/// Engine for TRON mainnet.
#[derive(Clone)]
pub struct TronChain {
    max_tx_bytes: usize,
    resolver: Arc<dyn MagicConstantResolver>,
}

impl std::fmt::Debug for TronChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TronChain")
            .field("max_tx_bytes", &self.max_tx_bytes)
            .finish_non_exhaustive()
    }
}

impl TronChain {
    /// Engine with the default 32 KiB size cap.
    #[must_use]
    pub fn new(resolver: Arc<dyn MagicConstantResolver>) -> Self {
        Self {
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

    fn decode_call(raw: &RawData<'_>, protocol: &str) -> Result<TronCall, PolicyError> {
        let [contract] = raw.contracts.as_slice() else {
            return Err(PolicyError::structural(format!(
                "expected exactly one contract, got {}",
                raw.contracts.len()
            )));
        };
        let param = contract.parameter.as_ref().ok_or_else(|| {
            PolicyError::structural("contract has no parameter")
        })?;

        match (contract.contract_type, protocol) {
            (TRANSFER_CONTRACT, "trx") => {
                expect_type_url(param.type_url, "TransferContract")?;
                let msg = proto::decode_transfer(param.value)?;
                Ok(TronCall::Trx {
                    recipient: encode_address(msg.to_address)?,
                    amount: msg.amount,
                })
            }
            (TRIGGER_SMART_CONTRACT, "trc20") => {
                expect_type_url(param.type_url, "TriggerSmartContract")?;
                let msg = proto::decode_trigger(param.value)?;
                if msg.call_value != 0 {
                    return Err(PolicyError::structural(format!(
                        "TRC-20 transfer carries a call value of {}",
                        msg.call_value
                    )));
                }
                match decode_erc20_call(msg.data)? {
                    Some(Erc20Call::Transfer { to, amount }) => Ok(TronCall::Trc20 {
                        contract: encode_address(msg.contract_address)?,
                        recipient: encode_account(&<[u8; 20]>::from(to)),
                        amount,
                    }),
                    _ => Err(PolicyError::unsupported(
                        "only transfer(address,uint256) is supported on TRC-20 contracts",
                    )),
                }
            }
            (TRANSFER_CONTRACT | TRIGGER_SMART_CONTRACT, _) => Err(PolicyError::structural(
                format!(
                    "contract type {} cannot be evaluated under protocol {protocol}",
                    contract.contract_type
                ),
            )),
            (other, _) => Err(PolicyError::unsupported(format!(
                "contract type {other} is not supported"
            ))),
        }
    }
}

fn expect_type_url(type_url: &str, name: &str) -> Result<(), PolicyError> {
    let expected = format!("type.googleapis.com/protocol.{name}");
    if type_url == expected {
        Ok(())
    } else {
        Err(PolicyError::malformed(format!(
            "contract parameter is {type_url}, expected {expected}"
        )))
    }
}

impl Engine for TronChain {
    fn id(&self) -> &str {
        TRON_CHAIN_ID
    }

    fn evaluate(&self, rule: &Rule, tx: &[u8]) -> Result<(), PolicyError> {
        let path = prepare(rule, TRON_CHAIN_ID)?;
        tracing::debug!(chain = TRON_CHAIN_ID, resource = %path, "evaluating TRON rule");
        let outcome = self.evaluate_inner(rule, &path.protocol_id, &path.function_id, tx);
        if let Err(e) = &outcome {
            tracing::warn!(chain = TRON_CHAIN_ID, resource = %path, error = %e, "rule denied");
        }
        outcome
    }
}

impl TronChain {
    fn evaluate_inner(
        &self,
        rule: &Rule,
        protocol: &str,
        function: &str,
        tx: &[u8],
    ) -> Result<(), PolicyError> {
        let protocol = protocol.to_ascii_lowercase();
        let names: &[&str] = match protocol.as_str() {
            "trx" => &TRX_PARAMS,
            "trc20" => &TRC20_PARAMS,
            _ => {
                return Err(PolicyError::unsupported(format!(
                    "protocol {protocol} is not supported on {TRON_CHAIN_ID}"
                )))
            }
        };
        if !function.eq_ignore_ascii_case("transfer") {
            return Err(PolicyError::unsupported(format!(
                "function {function} is not supported on {TRON_CHAIN_ID}"
            )));
        }

        let constraints = &rule.parameter_constraints;
        reject_unknown_parameters(constraints, names)?;
        require_constraint(constraints, "recipient")?;
        require_constraint(constraints, "amount")?;

        check_size(tx, self.max_tx_bytes)?;
        let raw = decode_raw_data(tx)?;
        let call = Self::decode_call(&raw, &protocol)?;

        let ctx = ArgContext::new(TRON_CHAIN_ID, self.resolver.as_ref());
        let memo = std::str::from_utf8(raw.data)
            .map_err(|e| ParseError::malformed_transaction(format!("memo is not UTF-8: {e}")))?;

        match &call {
            TronCall::Trx { recipient, amount } => {
                let recipient = recipient.as_str();
                let amount = U256::from(*amount);
                assert_target(&ctx, &rule.target, recipient, ExactStringCompare::boxed)?;
                assert_arg(&ctx, constraints, "recipient", recipient, ExactStringCompare::boxed)?;
                assert_arg(&ctx, constraints, "amount", &amount, BigIntCompare::boxed)?;
            }
            TronCall::Trc20 {
                contract,
                recipient,
                amount,
            } => {
                let contract = contract.as_str();
                assert_target(&ctx, &rule.target, contract, ExactStringCompare::boxed)?;
                assert_arg(
                    &ctx,
                    constraints,
                    "recipient",
                    recipient.as_str(),
                    ExactStringCompare::boxed,
                )?;
                assert_arg(&ctx, constraints, "amount", amount, BigIntCompare::boxed)?;
                assert_arg(&ctx, constraints, "from_asset", contract, ExactStringCompare::boxed)?;
            }
        }
        assert_str_arg(&ctx, constraints, "memo", memo, StringCompare::boxed)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::evm::erc20::tests::transfer_calldata;
    use alloy_primitives::Address;
    use crate::tron::proto::tests::Writer;
    use txrule_core::{Constraint, ErrorKind, StaticResolver, Target};

    pub(crate) const USDT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

    fn raw_address(byte: u8) -> Vec<u8> {
        let mut raw = vec![TRON_ADDRESS_PREFIX];
        raw.extend_from_slice(&[byte; 20]);
        raw
    }

    fn wrap(contract_type: u64, name: &str, msg: &[u8]) -> Vec<u8> {
        let any = Writer::default()
            .bytes(1, format!("type.googleapis.com/protocol.{name}").as_bytes())
            .bytes(2, msg)
            .finish();
        Writer::default().uint(1, contract_type).bytes(2, &any).finish()
    }

    fn raw_data(contracts: &[Vec<u8>], memo: &[u8]) -> Vec<u8> {
        let mut w = Writer::default()
            .bytes(1, &[0x12, 0x34])
            .bytes(4, &[0x56; 8])
            .uint(8, 1_700_000_060_000);
        if !memo.is_empty() {
            w = w.bytes(10, memo);
        }
        for c in contracts {
            w = w.bytes(11, c);
        }
        w.uint(14, 1_700_000_000_000).uint(18, 10_000_000).finish()
    }

    pub(crate) fn trx_transfer(amount: u64) -> Vec<u8> {
        trx_transfer_with_memo(amount, b"")
    }

    fn trx_transfer_with_memo(amount: u64, memo: &[u8]) -> Vec<u8> {
        let msg = Writer::default()
            .bytes(1, &raw_address(0x11))
            .bytes(2, &raw_address(0x22))
            .uint(3, amount)
            .finish();
        raw_data(&[wrap(TRANSFER_CONTRACT, "TransferContract", &msg)], memo)
    }

    fn trc20_transfer(call_value: u64, amount: u64) -> Vec<u8> {
        let usdt = decode_address(USDT).unwrap();
        let mut msg = Writer::default()
            .bytes(1, &raw_address(0x11))
            .bytes(2, &usdt);
        if call_value > 0 {
            msg = msg.uint(3, call_value);
        }
        let data = transfer_calldata(Address::repeat_byte(0x33), U256::from(amount));
        let msg = msg.bytes(4, &data).finish();
        raw_data(&[wrap(TRIGGER_SMART_CONTRACT, "TriggerSmartContract", &msg)], b"invoice-7")
    }

    fn engine() -> TronChain {
        TronChain::new(Arc::new(StaticResolver::new()))
    }

    fn recipient(byte: u8) -> String {
        encode_account(&[byte; 20])
    }

    #[test]
    fn test_tx_hash_ignores_signatures() {
        let raw = trx_transfer(5);
        let expected = B256::from_slice(&Sha256::digest(&raw));
        let none: [&[u8]; 0] = [];
        assert_eq!(compute_tx_hash(&raw, &none), expected);
        assert_eq!(compute_tx_hash(&raw, &[vec![1u8; 65], vec![2u8; 65]]), expected);
    }

    #[test]
    fn test_trx_transfer_allowed() {
        let rule = Rule::allow("tron.trx.transfer")
            .with_target(Target::Address(recipient(0x22)))
            .with_constraint("recipient", Constraint::fixed(recipient(0x22)))
            .with_constraint("amount", Constraint::max("2000000"));
        engine().evaluate(&rule, &trx_transfer(1_000_000)).unwrap();
    }

    #[test]
    fn test_trx_amount_violation() {
        let rule = Rule::allow("tron.trx.transfer")
            .with_constraint("recipient", Constraint::any())
            .with_constraint("amount", Constraint::max("10"));
        let err = engine().evaluate(&rule, &trx_transfer(11)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_trx_target_mismatch() {
        let rule = Rule::allow("tron.trx.transfer")
            .with_target(Target::Address(recipient(0x99)))
            .with_constraint("recipient", Constraint::any())
            .with_constraint("amount", Constraint::any());
        let err = engine().evaluate(&rule, &trx_transfer(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TargetMismatch);
    }

    #[test]
    fn test_memo_must_be_utf8() {
        let rule = Rule::allow("tron.trx.transfer")
            .with_constraint("recipient", Constraint::any())
            .with_constraint("amount", Constraint::any())
            .with_constraint("memo", Constraint::fixed("pay\u{fffd}"));

        let err = engine()
            .evaluate(&rule, &trx_transfer_with_memo(1, b"pay\xff"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);

        engine()
            .evaluate(&rule, &trx_transfer_with_memo(1, "pay\u{fffd}".as_bytes()))
            .unwrap();
    }

    #[test]
    fn test_trc20_transfer_allowed() {
        let rule = Rule::allow("tron.trc20.transfer")
            .with_target(Target::Address(USDT.into()))
            .with_constraint("recipient", Constraint::fixed(recipient(0x33)))
            .with_constraint("amount", Constraint::fixed("500"))
            .with_constraint("from_asset", Constraint::fixed(USDT))
            .with_constraint("memo", Constraint::regexp("^invoice-[0-9]+$"));
        engine().evaluate(&rule, &trc20_transfer(0, 500)).unwrap();
    }

    #[test]
    fn test_trc20_call_value_rejected() {
        let rule = Rule::allow("tron.trc20.transfer")
            .with_constraint("recipient", Constraint::any())
            .with_constraint("amount", Constraint::any());
        let err = engine().evaluate(&rule, &trc20_transfer(1, 500)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralViolation);
    }

    #[test]
    fn test_contract_kind_must_match_protocol() {
        let rule = Rule::allow("tron.trc20.transfer")
            .with_constraint("recipient", Constraint::any())
            .with_constraint("amount", Constraint::any());
        let err = engine().evaluate(&rule, &trx_transfer(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralViolation);
    }

    #[test]
    fn test_multiple_contracts_rejected() {
        let msg = Writer::default().bytes(2, &raw_address(0x22)).uint(3, 1).finish();
        let c = wrap(TRANSFER_CONTRACT, "TransferContract", &msg);
        let raw = raw_data(&[c.clone(), c], b"");
        let rule = Rule::allow("tron.trx.transfer")
            .with_constraint("recipient", Constraint::any())
            .with_constraint("amount", Constraint::any());
        let err = engine().evaluate(&rule, &raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralViolation);
    }

    #[test]
    fn test_size_cap_and_empty() {
        let rule = Rule::allow("tron.trx.transfer")
            .with_constraint("recipient", Constraint::any())
            .with_constraint("amount", Constraint::any());
        let err = engine().evaluate(&rule, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);

        let small = engine().with_max_tx_bytes(16);
        let err = small.evaluate(&rule, &trx_transfer(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn test_unknown_protocol_and_params() {
        let rule = Rule::allow("tron.trc10.transfer");
        let err = engine().evaluate(&rule, &trx_transfer(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedProtocol);

        let rule = Rule::allow("tron.trx.transfer")
            .with_constraint("recipient", Constraint::any())
            .with_constraint("amount", Constraint::any())
            .with_constraint("from_asset", Constraint::any());
        let err = engine().evaluate(&rule, &trx_transfer(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RuleShape);
    }

    #[test]
    fn test_unsupported_contract_type() {
        let c = wrap(2, "TransferAssetContract", &[]);
        let raw = raw_data(&[c], b"");
        let rule = Rule::allow("tron.trx.transfer")
            .with_constraint("recipient", Constraint::any())
            .with_constraint("amount", Constraint::any());
        let err = engine().evaluate(&rule, &raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedProtocol);
    }
}
