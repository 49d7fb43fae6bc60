//! Solana engine: IDL-driven single-instruction matching.
//!
//! Resource paths read `solana.<idl name>.<instruction>`. Every account and
//! argument the IDL declares for the instruction must be constrained, as
//! `account_<name>` and `arg_<name>` respectively; use `Any` to opt out.
//!
//! When a rule carries no target the program id is checked against the
//! address declared by the IDL instead. An IDL without an address cannot be
//! evaluated without a target.

pub mod idl;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bincode::Options;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::VersionedTransaction;
use txrule_core::config::IdlConfig;
use txrule_core::config_loader::read_asset;
use txrule_core::error::{ConfigError, ParseError};
use txrule_core::{
    assert_arg, assert_target, reject_unknown_parameters, require_constraint, ArgContext,
    BigIntCompare, BoolCompare, Compare, MagicConstantResolver, PolicyError, Rule, Target, U256,
};

use crate::engine::{prepare, Engine};

pub use idl::{ArgValue, Idl, IdlInstruction, IdlType};

/// Chain id of Solana mainnet in resource strings.
pub const SOLANA_CHAIN_ID: &str = "solana";

/// Protocol id of the built-in System Program IDL.
pub const SYSTEM_PROTOCOL: &str = "system";

fn system_idl() -> Idl {
    Idl::new(
        SYSTEM_PROTOCOL,
        Some(Pubkey::default()),
        vec![IdlInstruction {
            name: "transfer".to_string(),
            discriminator: 2u32.to_le_bytes().to_vec(),
            accounts: vec!["from".to_string(), "to".to_string()],
            args: vec![("lamports".to_string(), IdlType::U64)],
        }],
    )
}

// ============================================================================
// PubkeyCompare
// ============================================================================

/// Public key comparator. Supports `Fixed` and `Magic` only.
#[derive(Debug, Clone)]
pub struct PubkeyCompare {
    value: Pubkey,
}

impl PubkeyCompare {
    /// [`txrule_core::CompareCtor`] for [`Pubkey`].
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::MalformedInput`] for text that is not a base58
    /// 32-byte key.
    pub fn boxed(raw: &str) -> Result<Box<dyn Compare<Pubkey>>, PolicyError> {
        let value = raw
            .parse::<Pubkey>()
            .map_err(|_| ParseError::invalid_address(raw))?;
        Ok(Box::new(Self { value }))
    }
}

impl Compare<Pubkey> for PubkeyCompare {
    fn fixed(&self, actual: &Pubkey) -> bool {
        *actual == self.value
    }

    fn magic(&self, actual: &Pubkey) -> bool {
        *actual == self.value
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// The single instruction of a transaction with its accounts resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstruction {
    /// Invoked program.
    pub program_id: Pubkey,
    /// Instruction accounts in order.
    pub accounts: Vec<Pubkey>,
    /// Instruction data.
    pub data: Vec<u8>,
}

/// Decode a wire-format transaction and extract its only instruction.
///
/// # Errors
///
/// Returns [`PolicyError::MalformedInput`] for empty or undecodable bytes and
/// out-of-range account indices, and [`PolicyError::StructuralViolation`] for
/// address-lookup-table references or an instruction count other than one.
pub fn decode_instruction(raw: &[u8]) -> Result<DecodedInstruction, PolicyError> {
    if raw.is_empty() {
        return Err(PolicyError::malformed("empty transaction"));
    }
    let tx: VersionedTransaction = bincode::options()
        .with_fixint_encoding()
        .reject_trailing_bytes()
        .deserialize(raw)
        .map_err(|e| {
            ParseError::malformed_transaction(format!("failed to decode Solana transaction: {e}"))
        })?;

    if tx
        .message
        .address_table_lookups()
        .is_some_and(|lookups| !lookups.is_empty())
    {
        return Err(PolicyError::structural(
            "address lookup table accounts cannot be checked",
        ));
    }

    let instructions = tx.message.instructions();
    let [ix] = instructions else {
        return Err(PolicyError::structural(format!(
            "expected exactly one instruction, got {}",
            instructions.len()
        )));
    };

    let keys = tx.message.static_account_keys();
    let key = |index: u8| {
        keys.get(usize::from(index)).copied().ok_or_else(|| {
            ParseError::malformed_transaction(format!("account index {index} out of range"))
        })
    };

    Ok(DecodedInstruction {
        program_id: key(ix.program_id_index)?,
        accounts: ix.accounts.iter().map(|&i| key(i)).collect::<Result<_, _>>()?,
        data: ix.data.clone(),
    })
}

// ============================================================================
// SolanaChain
// ============================================================================

/// Solana engine holding the loaded IDLs.
#[derive(Clone)]
pub struct SolanaChain {
    idls: HashMap<String, Arc<Idl>>,
    resolver: Arc<dyn MagicConstantResolver>,
}

impl fmt::Debug for SolanaChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.idls.keys().collect();
        names.sort();
        f.debug_struct("SolanaChain")
            .field("idls", &names)
            .finish_non_exhaustive()
    }
}

impl SolanaChain {
    /// Engine with only the built-in System Program IDL.
    #[must_use]
    pub fn new(resolver: Arc<dyn MagicConstantResolver>) -> Self {
        let mut idls = HashMap::new();
        idls.insert(SYSTEM_PROTOCOL.to_string(), Arc::new(system_idl()));
        Self { idls, resolver }
    }

    /// Build from `[[solana_idls]]` entries.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a file cannot be read or parsed, or a
    /// name is registered twice.
    pub fn from_config(
        idls: &[IdlConfig],
        resolver: Arc<dyn MagicConstantResolver>,
    ) -> Result<Self, ConfigError> {
        let mut chain = Self::new(resolver);
        for entry in idls {
            let json = read_asset(&entry.path)?;
            let idl = Idl::from_json(&entry.name, &json)
                .map_err(|e| ConfigError::parse_failed(format!("{}: {e}", entry.path)))?;
            chain.register_idl(idl)?;
        }
        tracing::debug!(idls = chain.idls.len(), "Solana engine configured");
        Ok(chain)
    }

    /// Register an IDL under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the name is taken.
    pub fn register_idl(&mut self, idl: Idl) -> Result<(), ConfigError> {
        let key = idl.name().to_ascii_lowercase();
        if self.idls.contains_key(&key) {
            return Err(ConfigError::invalid_value("solana_idls", idl.name()));
        }
        self.idls.insert(key, Arc::new(idl));
        Ok(())
    }

    /// Look up a loaded IDL.
    #[must_use]
    pub fn idl(&self, name: &str) -> Option<&Idl> {
        self.idls.get(&name.to_ascii_lowercase()).map(Arc::as_ref)
    }

    fn evaluate_inner(
        &self,
        rule: &Rule,
        protocol: &str,
        function: &str,
        tx: &[u8],
    ) -> Result<(), PolicyError> {
        let idl = self.idl(protocol).ok_or_else(|| {
            PolicyError::unsupported(format!("no IDL loaded for protocol {protocol}"))
        })?;
        let schema = idl.instruction(function).ok_or_else(|| {
            PolicyError::unsupported(format!("IDL {protocol} has no instruction {function}"))
        })?;

        let account_params: Vec<String> =
            schema.accounts.iter().map(|a| format!("account_{a}")).collect();
        let arg_params: Vec<String> =
            schema.args.iter().map(|(a, _)| format!("arg_{a}")).collect();
        let constraints = &rule.parameter_constraints;
        let known: Vec<&str> = account_params
            .iter()
            .chain(&arg_params)
            .map(String::as_str)
            .collect();
        reject_unknown_parameters(constraints, &known)?;
        for name in &known {
            require_constraint(constraints, name)?;
        }

        let decoded = decode_instruction(tx)?;
        let ctx = ArgContext::new(SOLANA_CHAIN_ID, self.resolver.as_ref());

        match (&rule.target, idl.address()) {
            (Target::Unspecified, Some(address)) => {
                if decoded.program_id != *address {
                    return Err(PolicyError::target_mismatch(
                        address.to_string(),
                        decoded.program_id.to_string(),
                    ));
                }
            }
            (Target::Unspecified, None) => {
                return Err(PolicyError::rule_shape(format!(
                    "IDL {protocol} declares no program address; the rule needs a target"
                )));
            }
            (target, _) => {
                assert_target(&ctx, target, &decoded.program_id, PubkeyCompare::boxed)?;
            }
        }

        if decoded.accounts.len() != schema.accounts.len() {
            return Err(PolicyError::structural(format!(
                "{function} takes {} accounts, instruction has {}",
                schema.accounts.len(),
                decoded.accounts.len()
            )));
        }
        for (param, key) in account_params.iter().zip(&decoded.accounts) {
            assert_arg(&ctx, constraints, param, key, PubkeyCompare::boxed)?;
        }

        let args = schema.decode_args(&decoded.data)?;
        for (param, (_, value)) in arg_params.iter().zip(&args) {
            match value {
                ArgValue::Uint(v) => {
                    assert_arg(&ctx, constraints, param, &U256::from(*v), BigIntCompare::boxed)?;
                }
                ArgValue::Bool(v) => assert_arg(&ctx, constraints, param, v, BoolCompare::boxed)?,
                ArgValue::Pubkey(v) => {
                    assert_arg(&ctx, constraints, param, v, PubkeyCompare::boxed)?;
                }
            }
        }
        Ok(())
    }
}

impl Engine for SolanaChain {
    fn id(&self) -> &str {
        SOLANA_CHAIN_ID
    }

    fn evaluate(&self, rule: &Rule, tx: &[u8]) -> Result<(), PolicyError> {
        let path = prepare(rule, SOLANA_CHAIN_ID)?;
        tracing::debug!(chain = SOLANA_CHAIN_ID, resource = %path, "evaluating Solana rule");

        let outcome = self.evaluate_inner(rule, &path.protocol_id, &path.function_id, tx);
        if let Err(e) = &outcome {
            tracing::warn!(chain = SOLANA_CHAIN_ID, resource = %path, error = %e, "rule denied");
        }
        outcome
    }
}
