//! # Check Command
//!
//! `txrule check --rule <FILE> --chain-tx <HEX>` evaluates one JSON rule
//! against one raw transaction.
//!
//! ## Output Formats
//!
//! ### Text (default)
//!
//! ```text
//! allowed: ethereum.eth.transfer
//! denied: ethereum.eth.transfer: constraint_violation: constraint violation on amount: ...
//! ```
//!
//! ### JSON
//!
//! ```json
//! {
//!   "resource": "ethereum.eth.transfer",
//!   "allowed": false,
//!   "kind": "constraint_violation",
//!   "reason": "constraint violation on amount: ..."
//! }
//! ```
//!
//! ## Exit Codes
//!
//! - 0: Allowed
//! - 1: Denied
//! - 2: Other error

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use txrule_core::config::Config;
use txrule_core::error::ConfigError;
use txrule_core::{ErrorKind, Rule, StaticResolver};
use txrule_policy::{PolicyDecision, PolicyEvaluator};

use super::exit_codes::{EXIT_ERROR, EXIT_POLICY_DENIED};
use super::{decode_hex, load_config};
use crate::cli::args::OutputFormat;

// ============================================================================
// CheckCommandError
// ============================================================================

/// Errors from the `check` command.
#[derive(Debug, thiserror::Error)]
pub enum CheckCommandError {
    /// The rule denied the transaction.
    #[error("Policy denied: {resource} - {kind}: {reason}")]
    PolicyDenied {
        /// The rule's resource string.
        resource: String,
        /// Error classification.
        kind: ErrorKind,
        /// Human-readable reason.
        reason: String,
    },

    /// The rule file could not be read.
    #[error("Failed to read rule file {path}: {source}")]
    RuleFile {
        /// The rule file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The rule file is not a valid rule.
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// The transaction argument is not hex.
    #[error("Invalid transaction hex: {0}")]
    InvalidTransaction(String),

    /// Configuration could not be loaded or engines could not be built.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CheckCommandError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::PolicyDenied { .. } => EXIT_POLICY_DENIED,
            _ => EXIT_ERROR,
        }
    }
}

// ============================================================================
// CheckCommand
// ============================================================================

/// The `txrule check` command handler.
#[derive(Debug, Clone)]
pub struct CheckCommand {
    /// Path to the JSON rule.
    pub rule: PathBuf,
    /// Hex-encoded transaction.
    pub transaction: String,
    /// Output format.
    pub format: OutputFormat,
}

impl CheckCommand {
    /// Create a new `CheckCommand`.
    #[must_use]
    pub fn new(
        rule: impl Into<PathBuf>,
        transaction: impl Into<String>,
        format: OutputFormat,
    ) -> Self {
        Self {
            rule: rule.into(),
            transaction: transaction.into(),
            format,
        }
    }

    /// Load configuration from `config_path` (or the default location) and
    /// run the check, printing the decision to stdout.
    ///
    /// # Errors
    ///
    /// Returns [`CheckCommandError::PolicyDenied`] when the rule denies the
    /// transaction, or another variant for configuration and input errors.
    pub fn run(&self, config_path: Option<&Path>) -> Result<(), CheckCommandError> {
        let config = load_config(config_path)?;
        let decision = self.evaluate(&config)?;
        let rendered = self.render(&decision)?;
        println!("{rendered}");
        match decision {
            Decision {
                outcome: PolicyDecision::Allowed,
                ..
            } => Ok(()),
            Decision {
                resource,
                outcome: PolicyDecision::Denied { kind, reason },
            } => Err(CheckCommandError::PolicyDenied {
                resource,
                kind,
                reason,
            }),
        }
    }

    /// Evaluate against `config` without printing.
    ///
    /// # Errors
    ///
    /// Returns an error for unreadable rules, bad hex or a bad configuration.
    /// A denial is not an error here; it is reported in the [`Decision`].
    pub fn evaluate(&self, config: &Config) -> Result<Decision, CheckCommandError> {
        let rule = read_rule(&self.rule)?;
        let tx = decode_hex(&self.transaction)
            .map_err(|e| CheckCommandError::InvalidTransaction(e.to_string()))?;

        let resolver = StaticResolver::from_config(config)?;
        let evaluator = PolicyEvaluator::from_config(config, Arc::new(resolver))?;
        tracing::debug!(resource = %rule.resource, bytes = tx.len(), "checking transaction");

        Ok(Decision {
            outcome: evaluator.check(&rule, &tx),
            resource: rule.resource,
        })
    }

    fn render(&self, decision: &Decision) -> Result<String, CheckCommandError> {
        match self.format {
            OutputFormat::Text => Ok(decision.to_string()),
            OutputFormat::Json => serde_json::to_string_pretty(&decision.to_json())
                .map_err(|e| CheckCommandError::InvalidRule(e.to_string())),
        }
    }
}

/// A policy decision for one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// The rule's resource string.
    pub resource: String,
    /// Allowed or denied.
    pub outcome: PolicyDecision,
}

impl Decision {
    fn to_json(&self) -> serde_json::Value {
        match &self.outcome {
            PolicyDecision::Allowed => serde_json::json!({
                "resource": self.resource,
                "allowed": true,
            }),
            PolicyDecision::Denied { kind, reason } => serde_json::json!({
                "resource": self.resource,
                "allowed": false,
                "kind": kind.as_str(),
                "reason": reason,
            }),
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            PolicyDecision::Allowed => write!(f, "allowed: {}", self.resource),
            PolicyDecision::Denied { kind, reason } => {
                write!(f, "denied: {}: {kind}: {reason}", self.resource)
            }
        }
    }
}

fn read_rule(path: &Path) -> Result<Rule, CheckCommandError> {
    let content = std::fs::read_to_string(path).map_err(|source| CheckCommandError::RuleFile {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| CheckCommandError::InvalidRule(e.to_string()))
}
