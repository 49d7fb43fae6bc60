//! The [`Engine`] trait implemented by every chain family.
//!
//! An engine decodes raw transaction bytes for one chain and checks them
//! against an `Allow` rule. Engines hold only state loaded at construction
//! (ABIs, token lists, IDLs, the resolver) and never mutate it during
//! evaluation, so a single instance is safe to share across threads.
//!
//! # Example
//!
//! ```rust
//! use txrule_chain::Engine;
//! use txrule_core::{PolicyError, Rule};
//!
//! struct AlwaysDeny;
//!
//! impl Engine for AlwaysDeny {
//!     fn id(&self) -> &str {
//!         "my-chain"
//!     }
//!
//!     fn evaluate(&self, rule: &Rule, _tx: &[u8]) -> Result<(), PolicyError> {
//!         Err(PolicyError::unsupported(rule.resource.clone()))
//!     }
//! }
//! ```

use txrule_core::{PolicyError, ResourcePath, Rule};

/// Chain-specific implementation of `Evaluate(Rule, txBytes)`.
pub trait Engine: Send + Sync {
    /// Chain id this engine answers for, as used in resource strings.
    fn id(&self) -> &str;

    /// Decode `tx` and check it against `rule`.
    ///
    /// Returns `Ok(())` only when the transaction fully matches. Any decode
    /// failure, shape problem, or failed constraint is an error.
    ///
    /// # Errors
    ///
    /// Returns the first [`PolicyError`] encountered.
    fn evaluate(&self, rule: &Rule, tx: &[u8]) -> Result<(), PolicyError>;
}

/// Common preamble: reject `Deny` rules, parse the resource, and check that it
/// names `chain`.
///
/// # Errors
///
/// Returns [`PolicyError::RuleShape`] for deny rules and malformed resources,
/// and [`PolicyError::UnsupportedProtocol`] when the resource names another chain.
pub fn prepare(rule: &Rule, chain: &str) -> Result<ResourcePath, PolicyError> {
    rule.ensure_allow()?;
    let path = rule.resource_path()?;
    if !path.chain_id.eq_ignore_ascii_case(chain) {
        return Err(PolicyError::unsupported(format!(
            "resource {path} submitted to the {chain} engine"
        )));
    }
    Ok(path)
}

/// Reject empty input and input above `max` bytes.
///
/// # Errors
///
/// Returns [`PolicyError::MalformedInput`].
pub fn check_size(tx: &[u8], max: usize) -> Result<(), PolicyError> {
    if tx.is_empty() {
        return Err(PolicyError::malformed("empty transaction"));
    }
    if tx.len() > max {
        return Err(PolicyError::malformed(format!(
            "transaction is {} bytes, limit is {max}",
            tx.len()
        )));
    }
    Ok(())
}
