//! End-to-end evaluation through [`PolicyEvaluator`] with the default engines
//! and built-in validators.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use common::{
    bitcoin_tx, cosmos_send, evm_tx, raw_bytes, tron_raw_address, tron_trx_transfer, BTC_CHANGE,
    BTC_PAYMENT,
};
use proptest::prelude::*;
use sha2::{Digest, Sha256};
use txrule_core::{Constraint, ErrorKind, Rule, StaticResolver, Target};
use txrule_policy::{PolicyDecision, PolicyEvaluator};

const ETH_RECIPIENT: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";
const GAIA_RECIPIENT: &str = "cosmos1yvd4dz8skm0tzdewy5hvl6j7hjrxcqlg6mtp5x";
const GAIA_OTHER: &str = "cosmos1kqyxmt4qsk3t4vhn5yvm3kx4q7fqpj8kquzmnw";

fn evaluator() -> PolicyEvaluator {
    PolicyEvaluator::with_builtin_validators(Arc::new(StaticResolver::new()))
}

// ----------------------------------------------------------------------------
// Bitcoin
// ----------------------------------------------------------------------------

fn two_output_rule() -> Rule {
    Rule::allow("bitcoin.btc.transfer")
        .with_constraint("output_address_0", Constraint::fixed(BTC_PAYMENT))
        .with_constraint("output_value_0", Constraint::fixed("1000000"))
        .with_constraint("output_address_1", Constraint::fixed(BTC_CHANGE))
        .with_constraint("output_value_1", Constraint::fixed("4772191"))
}

fn reference_tx() -> Vec<u8> {
    bitcoin_tx(&[(BTC_PAYMENT, 1_000_000), (BTC_CHANGE, 4_772_191)])
}

#[test]
fn bitcoin_outputs_fully_pinned_are_allowed() {
    assert_eq!(
        evaluator().check(&two_output_rule(), &reference_tx()),
        PolicyDecision::Allowed
    );
}

#[test]
fn bitcoin_output_value_violation_names_the_output() {
    for (index, literal) in [(0, "999999"), (1, "4772190")] {
        let name = format!("output_value_{index}");
        let mut rule = two_output_rule();
        for pc in &mut rule.parameter_constraints {
            if pc.parameter_name == name {
                pc.constraint = Constraint::fixed(literal);
            }
        }

        let err = evaluator().evaluate(&rule, &reference_tx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
        assert!(err.to_string().contains(&name), "{err}");
    }
}

#[test]
fn bitcoin_unconstrained_change_output_is_denied() {
    let rule = Rule::allow("bitcoin.btc.transfer")
        .with_constraint("output_address_0", Constraint::fixed(BTC_PAYMENT))
        .with_constraint("output_value_0", Constraint::fixed("1000000"));

    let err = evaluator().evaluate(&rule, &reference_tx()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralViolation);
    assert!(err.to_string().contains("output count mismatch"), "{err}");
}

// ----------------------------------------------------------------------------
// EVM
// ----------------------------------------------------------------------------

fn eth_transfer_rule() -> Rule {
    Rule::allow("ethereum.eth.transfer")
        .with_constraint("recipient", Constraint::fixed(ETH_RECIPIENT.to_lowercase()))
        .with_constraint("amount", Constraint::max("1000000000000000000"))
}

#[test]
fn native_transfer_with_calldata_is_not_a_transfer() {
    let to: Address = ETH_RECIPIENT.parse().unwrap();
    let tx = evm_tx(1, to, U256::from(1_000u64), vec![0xde, 0xad, 0xbe, 0xef]);

    let err = evaluator().evaluate(&eth_transfer_rule(), &tx).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralViolation);
}

#[test]
fn native_transfer_without_calldata_is_allowed() {
    let to: Address = ETH_RECIPIENT.parse().unwrap();
    let tx = evm_tx(1, to, U256::from(1_000u64), Vec::new());
    evaluator().evaluate(&eth_transfer_rule(), &tx).unwrap();
}

#[test]
fn native_transfer_on_wrong_chain_is_denied() {
    let to: Address = ETH_RECIPIENT.parse().unwrap();
    let tx = evm_tx(137, to, U256::from(1_000u64), Vec::new());
    let err = evaluator().evaluate(&eth_transfer_rule(), &tx).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralViolation);
}

// ----------------------------------------------------------------------------
// Cosmos
// ----------------------------------------------------------------------------

fn gaia_rule(recipient: &str) -> Rule {
    Rule::allow("gaia.atom.transfer")
        .with_target(Target::Address(recipient.into()))
        .with_constraint("recipient", Constraint::fixed(recipient))
        .with_constraint("amount", Constraint::fixed("1000000"))
        .with_constraint("denom", Constraint::fixed("uatom"))
}

#[test]
fn gaia_send_is_allowed() {
    let tx = cosmos_send(GAIA_RECIPIENT, "uatom", "1000000");
    evaluator().evaluate(&gaia_rule(GAIA_RECIPIENT), &tx).unwrap();
}

#[test]
fn gaia_send_to_other_target_is_a_target_mismatch() {
    let tx = cosmos_send(GAIA_RECIPIENT, "uatom", "1000000");
    let err = evaluator().evaluate(&gaia_rule(GAIA_OTHER), &tx).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TargetMismatch);
}

#[test]
fn thorchain_swap_with_loose_memo_never_reaches_decoding() {
    let rule = Rule::allow("thorchain.thorchain_swap.swap")
        .with_constraint("amount", Constraint::any())
        .with_constraint("memo", Constraint::min("0"));
    let err = evaluator().evaluate(&rule, b"not protobuf").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RuleShape);
}

// ----------------------------------------------------------------------------
// Tron
// ----------------------------------------------------------------------------

#[test]
fn tron_tx_hash_is_sha256_of_raw_data() {
    let raw = tron_trx_transfer(&tron_raw_address(0x11), &tron_raw_address(0x22), 1_000_000);
    let expected = Sha256::digest(&raw);

    let unsigned = txrule_chain::tron::compute_tx_hash(&raw, &[] as &[&[u8]]);
    assert_eq!(unsigned.as_slice(), expected.as_slice());

    let signed = txrule_chain::tron::compute_tx_hash(&raw, &[vec![0x5a_u8; 65]]);
    assert_eq!(signed, unsigned);
}

#[test]
fn tron_trx_transfer_is_allowed() {
    let to = tron_raw_address(0x22);
    let recipient = txrule_chain::tron::encode_address(&to).unwrap();
    let rule = Rule::allow("tron.trx.transfer")
        .with_target(Target::Address(recipient.clone()))
        .with_constraint("recipient", Constraint::fixed(recipient))
        .with_constraint("amount", Constraint::max("5000000"));

    let raw = tron_trx_transfer(&tron_raw_address(0x11), &to, 1_000_000);
    evaluator().evaluate(&rule, &raw).unwrap();

    let too_much = tron_trx_transfer(&tron_raw_address(0x11), &to, 5_000_001);
    let err = evaluator().evaluate(&rule, &too_much).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
}

// ----------------------------------------------------------------------------
// Properties
// ----------------------------------------------------------------------------

fn property_rules() -> Vec<Rule> {
    vec![
        two_output_rule(),
        eth_transfer_rule(),
        gaia_rule(GAIA_RECIPIENT),
        Rule::allow("tron.trx.transfer")
            .with_constraint("recipient", Constraint::any())
            .with_constraint("amount", Constraint::any()),
        Rule::allow("solana.system.transfer")
            .with_constraint("account_from", Constraint::any())
            .with_constraint("account_to", Constraint::any())
            .with_constraint("arg_lamports", Constraint::any()),
    ]
}

proptest! {
    #[test]
    fn evaluation_is_deterministic(tx in raw_bytes()) {
        let evaluator = evaluator();
        for rule in property_rules() {
            let first = evaluator.check(&rule, &tx);
            let second = evaluator.check(&rule, &tx);
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn arbitrary_bytes_never_panic(tx in raw_bytes()) {
        let evaluator = evaluator();
        for rule in property_rules() {
            let _ = evaluator.evaluate(&rule, &tx);
        }
    }
}
