//! Protocol validators: rule-shape checks keyed by protocol id.
//!
//! A validator runs before any engine decodes the transaction and rejects rules
//! that can never be evaluated safely for its protocol. The registry is written
//! during start-up and read during evaluation; registering a protocol id twice
//! is an error, never a silent overwrite.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use txrule_chain::utxo::{check_rule_shape, UtxoNetwork};
use txrule_core::error::ConfigError;
use txrule_core::{find_constraint, ConstraintKind, PolicyError, Rule};

/// Rule-shape checks for one or more protocol ids.
pub trait ProtocolValidator: Send + Sync {
    /// Human-readable validator name for logs.
    fn name(&self) -> &str;

    /// Check `rule` before evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::RuleShape`] when the rule is not acceptable.
    fn validate(&self, rule: &Rule) -> Result<(), PolicyError>;
}

// ============================================================================
// Built-in validators
// ============================================================================

/// Bitcoin-style rules: no target, only `output_address_<i>` /
/// `output_value_<i>` parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtxoOutputsValidator;

impl ProtocolValidator for UtxoOutputsValidator {
    fn name(&self) -> &str {
        "utxo_outputs"
    }

    fn validate(&self, rule: &Rule) -> Result<(), PolicyError> {
        check_rule_shape(&rule.target, &rule.parameter_constraints)
    }
}

/// THORChain / MayaChain deposit swaps: no target, and the memo (which
/// carries the real destination) must be pinned by `Fixed` or `Regexp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepositSwapValidator;

impl ProtocolValidator for DepositSwapValidator {
    fn name(&self) -> &str {
        "deposit_swap"
    }

    fn validate(&self, rule: &Rule) -> Result<(), PolicyError> {
        if !rule.target.is_unspecified() {
            return Err(PolicyError::rule_shape(format!(
                "deposit swaps take no target, got {}",
                rule.target
            )));
        }
        match find_constraint(&rule.parameter_constraints, "memo").map(|c| &c.kind) {
            Some(ConstraintKind::Fixed(_) | ConstraintKind::Regexp(_)) => Ok(()),
            Some(other) => Err(PolicyError::rule_shape(format!(
                "deposit swap memo must be fixed or regexp, got {other}"
            ))),
            None => Err(PolicyError::rule_shape(
                "deposit swap rules must constrain the memo",
            )),
        }
    }
}

// ============================================================================
// ValidatorRegistry
// ============================================================================

/// Validators keyed by lower-case protocol id.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: RwLock<HashMap<String, Arc<dyn ProtocolValidator>>>,
}

impl ValidatorRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in validators:
    ///
    /// - `btc`, `ltc`, `doge`: [`UtxoOutputsValidator`]
    /// - `thorchain_swap`, `mayachain_swap`: [`DepositSwapValidator`]
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut map: HashMap<String, Arc<dyn ProtocolValidator>> = HashMap::new();
        let utxo: Arc<dyn ProtocolValidator> = Arc::new(UtxoOutputsValidator);
        for network in UtxoNetwork::ALL {
            map.insert(network.protocol_id().to_string(), Arc::clone(&utxo));
        }
        let swap: Arc<dyn ProtocolValidator> = Arc::new(DepositSwapValidator);
        for id in ["thorchain_swap", "mayachain_swap"] {
            map.insert(id.to_string(), Arc::clone(&swap));
        }
        Self {
            validators: RwLock::new(map),
        }
    }

    /// Register `validator` for `protocol_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the id already has a validator.
    pub fn register(
        &self,
        protocol_id: &str,
        validator: Arc<dyn ProtocolValidator>,
    ) -> Result<(), ConfigError> {
        let key = protocol_id.to_ascii_lowercase();
        let mut validators = self
            .validators
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if validators.contains_key(&key) {
            return Err(ConfigError::invalid_value("validators", key));
        }
        tracing::debug!(protocol = %key, validator = validator.name(), "registered validator");
        validators.insert(key, validator);
        Ok(())
    }

    /// The validator for `protocol_id`, if any.
    #[must_use]
    pub fn get(&self, protocol_id: &str) -> Option<Arc<dyn ProtocolValidator>> {
        self.validators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&protocol_id.to_ascii_lowercase())
            .cloned()
    }

    /// Number of registered protocol ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.validators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the validator for the rule's protocol, if one is registered.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::RuleShape`] for a malformed resource or a rule
    /// the validator rejects.
    pub fn validate(&self, rule: &Rule) -> Result<(), PolicyError> {
        let path = rule.resource_path()?;
        match self.get(&path.protocol_id) {
            Some(validator) => validator.validate(rule),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let validators = self
            .validators
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<&str> = validators.keys().map(String::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("ValidatorRegistry")
            .field("protocols", &ids)
            .finish()
    }
}
