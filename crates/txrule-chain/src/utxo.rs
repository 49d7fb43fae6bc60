//! Bitcoin-style UTXO engine (Bitcoin, Litecoin, Dogecoin).
//!
//! Rules for these chains carry no target. Every output is pinned by an
//! `output_address_<i>` and an `output_value_<i>` constraint, and the set of
//! referenced indices must cover the transaction's outputs exactly:
//!
//! | Constraint set | Outputs | Result |
//! |----------------|---------|--------|
//! | `{0, 1}` (address and value each) | 2 | evaluated |
//! | `{0}` | 2 | output count mismatch |
//! | `{0, 1}` with `output_value_1` missing | 2 | output count mismatch |
//!
//! All three chains share Bitcoin's wire format; only the script-to-address
//! step differs, via [`UtxoNetwork`].

use std::collections::BTreeMap;
use std::sync::Arc;

use bech32::{segwit, Fe32, Hrp};
use bitcoin::{consensus, Network, Script, Transaction};
use txrule_core::error::ParseError;
use txrule_core::{
    assert_arg, ArgContext, CompareCtor, ExactStringCompare, MagicConstantResolver,
    ParameterConstraint, PolicyError, Rule, StringCompare, Target, UintCompare,
};

use crate::engine::{prepare, Engine};

/// Prefix of per-output address constraints.
pub const OUTPUT_ADDRESS_PREFIX: &str = "output_address_";

/// Prefix of per-output value constraints.
pub const OUTPUT_VALUE_PREFIX: &str = "output_value_";

/// A UTXO network and its address encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UtxoNetwork {
    /// Bitcoin mainnet.
    Bitcoin,
    /// Litecoin mainnet.
    Litecoin,
    /// Dogecoin mainnet.
    Dogecoin,
}

impl UtxoNetwork {
    /// Every supported network.
    pub const ALL: [Self; 3] = [Self::Bitcoin, Self::Litecoin, Self::Dogecoin];

    /// Chain id in resource strings.
    #[must_use]
    pub const fn chain_id(self) -> &'static str {
        match self {
            Self::Bitcoin => "bitcoin",
            Self::Litecoin => "litecoin",
            Self::Dogecoin => "dogecoin",
        }
    }

    /// Protocol id of the native coin.
    #[must_use]
    pub const fn protocol_id(self) -> &'static str {
        match self {
            Self::Bitcoin => "btc",
            Self::Litecoin => "ltc",
            Self::Dogecoin => "doge",
        }
    }

    const fn p2pkh_version(self) -> u8 {
        match self {
            Self::Bitcoin => 0x00,
            Self::Litecoin => 0x30,
            Self::Dogecoin => 0x1e,
        }
    }

    const fn p2sh_version(self) -> u8 {
        match self {
            Self::Bitcoin => 0x05,
            Self::Litecoin => 0x32,
            Self::Dogecoin => 0x16,
        }
    }

    const fn segwit_hrp(self) -> Option<&'static str> {
        match self {
            Self::Bitcoin => Some("bc"),
            Self::Litecoin => Some("ltc"),
            Self::Dogecoin => None,
        }
    }

    /// Render the address a locking script pays to.
    ///
    /// Returns `None` for scripts without a standard address (e.g.
    /// `OP_RETURN`, bare multisig).
    #[must_use]
    pub fn script_address(self, script: &Script) -> Option<String> {
        if self == Self::Bitcoin {
            return bitcoin::Address::from_script(script, Network::Bitcoin)
                .ok()
                .map(|a| a.to_string());
        }

        let bytes = script.as_bytes();
        if script.is_p2pkh() {
            return bytes
                .get(3..23)
                .map(|hash| encode_base58check(self.p2pkh_version(), hash));
        }
        if script.is_p2sh() {
            return bytes
                .get(2..22)
                .map(|hash| encode_base58check(self.p2sh_version(), hash));
        }
        let hrp = Hrp::parse(self.segwit_hrp()?).ok()?;
        let version = Fe32::try_from(script.witness_version()?.to_num()).ok()?;
        segwit::encode(hrp, version, bytes.get(2..)?).ok()
    }
}

/// Base58check of `version ‖ hash` with a double-SHA-256 checksum.
#[must_use]
pub fn encode_base58check(version: u8, hash: &[u8]) -> String {
    let mut payload = Vec::with_capacity(hash.len() + 1);
    payload.push(version);
    payload.extend_from_slice(hash);
    bs58::encode(payload).with_check().into_string()
}

/// Inverse of [`encode_base58check`]: returns `(version, hash)`.
///
/// # Errors
///
/// Returns [`ParseError::InvalidAddress`] for bad characters, a bad checksum,
/// or an empty payload.
pub fn decode_base58check(address: &str) -> Result<(u8, Vec<u8>), ParseError> {
    let payload = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|_| ParseError::invalid_address(address))?;
    let (version, hash) = payload
        .split_first()
        .ok_or_else(|| ParseError::invalid_address(address))?;
    Ok((*version, hash.to_vec()))
}

/// Decode a consensus-serialized transaction, rejecting trailing bytes.
///
/// # Errors
///
/// Returns [`ParseError::MalformedTransaction`].
pub fn decode_transaction(raw: &[u8]) -> Result<Transaction, ParseError> {
    if raw.is_empty() {
        return Err(ParseError::malformed_transaction("empty transaction data"));
    }
    consensus::deserialize(raw).map_err(|e| {
        ParseError::malformed_transaction(format!("failed to decode UTXO transaction: {e}"))
    })
}

/// Which constraints name each output index.
#[derive(Debug, Default, Clone, Copy)]
struct OutputCoverage {
    address: bool,
    value: bool,
}

/// Split a constraint name into its output field and index.
fn output_index(name: &str) -> Option<(bool, usize)> {
    if let Some(index) = name.strip_prefix(OUTPUT_ADDRESS_PREFIX) {
        return index.parse().ok().map(|i| (true, i));
    }
    if let Some(index) = name.strip_prefix(OUTPUT_VALUE_PREFIX) {
        return index.parse().ok().map(|i| (false, i));
    }
    None
}

/// Check target and constraint names, then that the referenced indices cover
/// exactly `output_count` outputs.
///
/// # Errors
///
/// Returns [`PolicyError::RuleShape`] for a target or a foreign parameter
/// name, and [`PolicyError::StructuralViolation`] on a count mismatch.
pub fn check_output_coverage(
    target: &Target,
    constraints: &[ParameterConstraint],
    output_count: usize,
) -> Result<(), PolicyError> {
    check_rule_shape(target, constraints)?;

    let mut coverage: BTreeMap<usize, OutputCoverage> = BTreeMap::new();
    for pc in constraints {
        if let Some((is_address, index)) = output_index(&pc.parameter_name) {
            let entry = coverage.entry(index).or_default();
            if is_address {
                entry.address = true;
            } else {
                entry.value = true;
            }
        }
    }

    let complete = coverage.len() == output_count
        && coverage
            .iter()
            .all(|(index, c)| *index < output_count && c.address && c.value);
    if !complete {
        return Err(PolicyError::structural(format!(
            "output count mismatch: rule covers {} outputs, transaction has {output_count}",
            coverage.len()
        )));
    }
    Ok(())
}

/// Reject targets and parameter names outside the output namespace.
///
/// # Errors
///
/// Returns [`PolicyError::RuleShape`].
pub fn check_rule_shape(
    target: &Target,
    constraints: &[ParameterConstraint],
) -> Result<(), PolicyError> {
    if !target.is_unspecified() {
        return Err(PolicyError::rule_shape(format!(
            "UTXO rules take no target, got {target}"
        )));
    }
    if let Some(pc) = constraints
        .iter()
        .find(|pc| output_index(&pc.parameter_name).is_none())
    {
        return Err(PolicyError::rule_shape(format!(
            "parameter {} is not an output_address_<i> or output_value_<i> name",
            pc.parameter_name
        )));
    }
    Ok(())
}

/// Engine for one UTXO network.
#[derive(Clone)]
pub struct UtxoChain {
    network: UtxoNetwork,
    resolver: Arc<dyn MagicConstantResolver>,
}

impl std::fmt::Debug for UtxoChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UtxoChain")
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

impl UtxoChain {
    /// Engine for `network`.
    #[must_use]
    pub fn new(network: UtxoNetwork, resolver: Arc<dyn MagicConstantResolver>) -> Self {
        Self { network, resolver }
    }

    /// The configured network.
    #[must_use]
    pub const fn network(&self) -> UtxoNetwork {
        self.network
    }
}

/// Segwit addresses are bech32 and compare case-insensitively; base58
/// addresses compare exactly.
fn address_ctor(script: &Script) -> CompareCtor<str> {
    if script.witness_version().is_some() {
        StringCompare::boxed
    } else {
        ExactStringCompare::boxed
    }
}

impl Engine for UtxoChain {
    fn id(&self) -> &str {
        self.network.chain_id()
    }

    fn evaluate(&self, rule: &Rule, tx: &[u8]) -> Result<(), PolicyError> {
        let path = prepare(rule, self.network.chain_id())?;
        tracing::debug!(chain = self.network.chain_id(), resource = %path, "evaluating UTXO rule");

        if !path.protocol_id.eq_ignore_ascii_case(self.network.protocol_id()) {
            return Err(PolicyError::unsupported(format!(
                "protocol {} is not supported on {}",
                path.protocol_id,
                self.network.chain_id()
            )));
        }
        if !path.function_id.eq_ignore_ascii_case("transfer") {
            return Err(PolicyError::unsupported(format!(
                "function {} is not supported on {}",
                path.function_id,
                self.network.chain_id()
            )));
        }

        let decoded = decode_transaction(tx)?;
        let outcome = self.check_outputs(rule, &decoded);
        if let Err(e) = &outcome {
            tracing::warn!(
                chain = self.network.chain_id(),
                resource = %path,
                error = %e,
                "rule denied"
            );
        }
        outcome
    }
}

impl UtxoChain {
    fn check_outputs(&self, rule: &Rule, tx: &Transaction) -> Result<(), PolicyError> {
        let constraints = &rule.parameter_constraints;
        check_output_coverage(&rule.target, constraints, tx.output.len())?;

        let ctx = ArgContext::new(self.network.chain_id(), self.resolver.as_ref());
        for (index, output) in tx.output.iter().enumerate() {
            let address = self
                .network
                .script_address(&output.script_pubkey)
                .ok_or_else(|| {
                    PolicyError::structural(format!("output {index} has no standard address"))
                })?;
            assert_arg(
                &ctx,
                constraints,
                &format!("{OUTPUT_ADDRESS_PREFIX}{index}"),
                address.as_str(),
                address_ctor(&output.script_pubkey),
            )?;
            assert_arg(
                &ctx,
                constraints,
                &format!("{OUTPUT_VALUE_PREFIX}{index}"),
                &output.value.to_sat(),
                UintCompare::<u64>::boxed,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

    use super::*;
    use bitcoin::absolute::LockTime;
    use bitcoin::hashes::Hash;
    use bitcoin::transaction::Version;
    use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, TxIn, TxOut, Txid, Witness};
    use proptest::prelude::*;
    use std::str::FromStr;
    use txrule_core::{Constraint, ErrorKind, MagicConstant, StaticResolver};

    pub(crate) const PAYMENT: &str = "bc1qw5alzf5pu2hlnmn429jqq54qd9dvf2a2jjvvv0";
    pub(crate) const CHANGE: &str = "bc1ql5624ufxtk67zlkr42rzh4pqlkfqpgfh220msa";

    fn script_for(address: &str) -> ScriptBuf {
        bitcoin::Address::from_str(address)
            .unwrap()
            .require_network(Network::Bitcoin)
            .unwrap()
            .script_pubkey()
    }

    pub(crate) fn build_tx(outputs: &[(ScriptBuf, u64)]) -> Vec<u8> {
        let tx = Transaction {
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
                .map(|(script, value)| TxOut {
                    value: Amount::from_sat(*value),
                    script_pubkey: script.clone(),
                })
                .collect(),
        };
        consensus::serialize(&tx)
    }

    /// Two outputs: 1 000 000 sats payment and 4 772 191 sats change.
    pub(crate) fn two_output_tx() -> Vec<u8> {
        build_tx(&[(script_for(PAYMENT), 1_000_000), (script_for(CHANGE), 4_772_191)])
    }

    pub(crate) fn two_output_rule() -> Rule {
        Rule::allow("bitcoin.btc.transfer")
            .with_constraint("output_address_0", Constraint::fixed(PAYMENT))
            .with_constraint("output_value_0", Constraint::fixed("1000000"))
            .with_constraint("output_address_1", Constraint::fixed(CHANGE))
            .with_constraint("output_value_1", Constraint::fixed("4772191"))
    }

    fn bitcoin_engine() -> UtxoChain {
        UtxoChain::new(UtxoNetwork::Bitcoin, Arc::new(StaticResolver::new()))
    }

    // ------------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------------

    #[test]
    fn test_exact_outputs_allowed() {
        bitcoin_engine().evaluate(&two_output_rule(), &two_output_tx()).unwrap();
    }

    #[test]
    fn test_value_violation_names_output() {
        let mut rule = two_output_rule();
        rule.parameter_constraints[3].constraint = Constraint::fixed("4772190");
        let err = bitcoin_engine().evaluate(&rule, &two_output_tx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
        assert!(err.to_string().contains("output_value_1"));
    }

    #[test]
    fn test_address_violation_names_output() {
        let mut rule = two_output_rule();
        rule.parameter_constraints[0].constraint = Constraint::fixed(CHANGE);
        let err = bitcoin_engine().evaluate(&rule, &two_output_tx()).unwrap_err();
        assert!(err.to_string().contains("output_address_0"));
    }

    #[test]
    fn test_missing_output_is_count_mismatch() {
        let mut rule = two_output_rule();
        rule.parameter_constraints.truncate(2);
        let err = bitcoin_engine().evaluate(&rule, &two_output_tx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralViolation);
        assert!(err.to_string().contains("output count mismatch"));
    }

    #[test]
    fn test_half_covered_output_is_count_mismatch() {
        let mut rule = two_output_rule();
        rule.parameter_constraints.remove(3);
        let err = bitcoin_engine().evaluate(&rule, &two_output_tx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralViolation);
    }

    #[test]
    fn test_out_of_range_index_is_count_mismatch() {
        let rule = Rule::allow("bitcoin.btc.transfer")
            .with_constraint("output_address_0", Constraint::any())
            .with_constraint("output_value_0", Constraint::any())
            .with_constraint("output_address_7", Constraint::any())
            .with_constraint("output_value_7", Constraint::any());
        let err = bitcoin_engine().evaluate(&rule, &two_output_tx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralViolation);
    }

    #[test]
    fn test_target_rejected() {
        let rule = two_output_rule().with_target(Target::Address(PAYMENT.into()));
        let err = bitcoin_engine().evaluate(&rule, &two_output_tx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RuleShape);
    }

    #[test]
    fn test_foreign_parameter_rejected() {
        let rule = two_output_rule().with_constraint("recipient", Constraint::any());
        let err = bitcoin_engine().evaluate(&rule, &two_output_tx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RuleShape);
    }

    #[test]
    fn test_value_bounds_and_magic_address() {
        let resolver =
            StaticResolver::new().with(MagicConstant::VultisigTreasury, "bitcoin", CHANGE);
        let engine = UtxoChain::new(UtxoNetwork::Bitcoin, Arc::new(resolver));
        let rule = Rule::allow("bitcoin.btc.transfer")
            .with_constraint("output_address_0", Constraint::fixed(PAYMENT.to_uppercase()))
            .with_constraint("output_value_0", Constraint::max("1000000"))
            .with_constraint("output_address_1", Constraint::magic(MagicConstant::VultisigTreasury))
            .with_constraint("output_value_1", Constraint::min("1"));
        engine.evaluate(&rule, &two_output_tx()).unwrap();
    }

    #[test]
    fn test_address_has_no_order() {
        let mut rule = two_output_rule();
        rule.parameter_constraints[0].constraint = Constraint::min(PAYMENT);
        let err = bitcoin_engine().evaluate(&rule, &two_output_tx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_wrong_protocol_or_function() {
        let mut rule = two_output_rule();
        rule.resource = "bitcoin.ltc.transfer".into();
        let err = bitcoin_engine().evaluate(&rule, &two_output_tx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedProtocol);

        rule.resource = "bitcoin.btc.swap".into();
        let err = bitcoin_engine().evaluate(&rule, &two_output_tx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedProtocol);
    }

    #[test]
    fn test_malformed_and_trailing_bytes() {
        let err = bitcoin_engine().evaluate(&two_output_rule(), &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);

        let mut tx = two_output_tx();
        tx.push(0);
        let err = bitcoin_engine().evaluate(&two_output_rule(), &tx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn test_op_return_output_has_no_address() {
        let op_return = bitcoin::script::Builder::new()
            .push_opcode(bitcoin::opcodes::all::OP_RETURN)
            .into_script();
        let tx = build_tx(&[(op_return, 0)]);
        let rule = Rule::allow("bitcoin.btc.transfer")
            .with_constraint("output_address_0", Constraint::any())
            .with_constraint("output_value_0", Constraint::any());
        let err = bitcoin_engine().evaluate(&rule, &tx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralViolation);
    }

    // ------------------------------------------------------------------------
    // Addresses
    // ------------------------------------------------------------------------

    #[test]
    fn test_litecoin_and_dogecoin_addresses() {
        let hash = [0x11u8; 20];
        let p2pkh = ScriptBuf::new_p2pkh(&bitcoin::PubkeyHash::from_byte_array(hash));
        let p2wpkh = ScriptBuf::new_p2wpkh(&bitcoin::WPubkeyHash::from_byte_array(hash));

        let ltc = UtxoNetwork::Litecoin.script_address(&p2pkh).unwrap();
        assert!(ltc.starts_with('L'));
        assert_eq!(decode_base58check(&ltc).unwrap(), (0x30, hash.to_vec()));

        let doge = UtxoNetwork::Dogecoin.script_address(&p2pkh).unwrap();
        assert!(doge.starts_with('D'));

        let ltc_segwit = UtxoNetwork::Litecoin.script_address(&p2wpkh).unwrap();
        assert!(ltc_segwit.starts_with("ltc1q"));
        assert!(UtxoNetwork::Dogecoin.script_address(&p2wpkh).is_none());

        let btc = UtxoNetwork::Bitcoin.script_address(&script_for(PAYMENT)).unwrap();
        assert_eq!(btc, PAYMENT);
    }

    #[test]
    fn test_litecoin_engine() {
        let hash = [0x22u8; 20];
        let script = ScriptBuf::new_p2pkh(&bitcoin::PubkeyHash::from_byte_array(hash));
        let address = encode_base58check(0x30, &hash);
        let tx = build_tx(&[(script, 50_000)]);
        let rule = Rule::allow("litecoin.ltc.transfer")
            .with_constraint("output_address_0", Constraint::fixed(address.clone()))
            .with_constraint("output_value_0", Constraint::fixed("50000"));
        let engine = UtxoChain::new(UtxoNetwork::Litecoin, Arc::new(StaticResolver::new()));
        engine.evaluate(&rule, &tx).unwrap();

        // Base58 comparisons are case-sensitive.
        let rule = Rule::allow("litecoin.ltc.transfer")
            .with_constraint("output_address_0", Constraint::fixed(address.to_lowercase()))
            .with_constraint("output_value_0", Constraint::fixed("50000"));
        assert!(engine.evaluate(&rule, &tx).is_err());
    }

    #[test]
    fn test_decode_base58check_rejects_bad_checksum() {
        let mut address = encode_base58check(0x00, &[0x33; 20]);
        let last = address.pop().unwrap();
        address.push(if last == '1' { '2' } else { '1' });
        assert!(decode_base58check(&address).is_err());
    }

    proptest! {
        #[test]
        fn prop_base58check_round_trip(
            version in any::<u8>(),
            hash in proptest::collection::vec(any::<u8>(), 20..=21),
        ) {
            let encoded = encode_base58check(version, &hash);
            prop_assert_eq!(decode_base58check(&encoded).unwrap(), (version, hash));
        }

        #[test]
        fn prop_count_mismatch_independent_of_content(
            outputs in 1usize..6,
            covered in 0usize..6,
            literal in "[a-z0-9]{0,12}",
        ) {
            prop_assume!(outputs != covered);
            let constraints: Vec<_> = (0..covered)
                .flat_map(|i| {
                    let fixed = Constraint::fixed(literal.clone());
                    [
                        ParameterConstraint::new(format!("output_address_{i}"), fixed.clone()),
                        ParameterConstraint::new(format!("output_value_{i}"), fixed),
                    ]
                })
                .collect();
            let err =
                check_output_coverage(&Target::Unspecified, &constraints, outputs).unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::StructuralViolation);
        }
    }
}
