//! Rule evaluation entry point.
//!
//! [`PolicyEvaluator`] runs the protocol validator for a rule, then hands the
//! rule and transaction to the engine for the rule's chain.
//!
//! # Evaluation Order
//!
//! 1. **Resource** - the rule's resource must be `chain.protocol.function`.
//! 2. **Validator** - if the protocol has a validator, the rule must pass it.
//! 3. **Engine** - the chain engine decodes the transaction and checks the
//!    rule's target and parameter constraints.
//!
//! The first failure denies.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use txrule_core::{Rule, StaticResolver};
//! use txrule_policy::PolicyEvaluator;
//!
//! let evaluator = PolicyEvaluator::with_builtin_validators(Arc::new(StaticResolver::new()));
//! let decision = evaluator.check(&Rule::allow("ethereum.eth.transfer"), &[0xde, 0xad]);
//! assert!(decision.is_denied());
//! ```

use std::sync::Arc;

use txrule_chain::EngineRegistry;
use txrule_core::config::Config;
use txrule_core::error::ConfigError;
use txrule_core::{ErrorKind, MagicConstantResolver, PolicyError, Rule};

use crate::validator::ValidatorRegistry;

/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    /// The transaction fully matches the rule.
    Allowed,

    /// The transaction does not match, or the rule cannot be evaluated.
    Denied {
        /// Error classification.
        kind: ErrorKind,
        /// Human-readable reason.
        reason: String,
    },
}

impl PolicyDecision {
    /// Returns `true` if the transaction is allowed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Returns `true` if the transaction is denied.
    #[must_use]
    pub const fn is_denied(&self) -> bool {
        !self.is_allowed()
    }
}

impl From<Result<(), PolicyError>> for PolicyDecision {
    fn from(result: Result<(), PolicyError>) -> Self {
        match result {
            Ok(()) => Self::Allowed,
            Err(e) => Self::Denied {
                kind: e.kind(),
                reason: e.to_string(),
            },
        }
    }
}

/// Validators plus engines.
#[derive(Debug)]
pub struct PolicyEvaluator {
    engines: EngineRegistry,
    validators: ValidatorRegistry,
}

impl PolicyEvaluator {
    /// Evaluator over `engines` with no validators.
    #[must_use]
    pub fn new(engines: EngineRegistry) -> Self {
        Self {
            engines,
            validators: ValidatorRegistry::new(),
        }
    }

    /// Default engines plus the built-in validators.
    #[must_use]
    pub fn with_builtin_validators(resolver: Arc<dyn MagicConstantResolver>) -> Self {
        Self {
            engines: EngineRegistry::with_defaults(resolver),
            validators: ValidatorRegistry::with_builtins(),
        }
    }

    /// Engines from `config` plus the built-in validators.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if an engine cannot be built.
    pub fn from_config(
        config: &Config,
        resolver: Arc<dyn MagicConstantResolver>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            engines: EngineRegistry::from_config(config, resolver)?,
            validators: ValidatorRegistry::with_builtins(),
        })
    }

    /// The engine registry.
    #[must_use]
    pub const fn engines(&self) -> &EngineRegistry {
        &self.engines
    }

    /// The validator registry. Register extra validators before evaluating.
    #[must_use]
    pub const fn validators(&self) -> &ValidatorRegistry {
        &self.validators
    }

    /// Evaluate `tx` against `rule`.
    ///
    /// # Errors
    ///
    /// Returns the first [`PolicyError`] from validation or evaluation.
    pub fn evaluate(&self, rule: &Rule, tx: &[u8]) -> Result<(), PolicyError> {
        self.validators.validate(rule)?;
        self.engines.evaluate(rule, tx)
    }

    /// [`evaluate`](Self::evaluate) folded into a [`PolicyDecision`].
    #[must_use]
    pub fn check(&self, rule: &Rule, tx: &[u8]) -> PolicyDecision {
        let decision = PolicyDecision::from(self.evaluate(rule, tx));
        match &decision {
            PolicyDecision::Allowed => {
                tracing::info!(resource = %rule.resource, "transaction allowed");
            }
            PolicyDecision::Denied { kind, reason } => {
                tracing::info!(
                    resource = %rule.resource,
                    kind = %kind,
                    reason = %reason,
                    "transaction denied"
                );
            }
        }
        decision
    }
}
