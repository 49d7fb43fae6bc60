//! Rule and resource data model shared by every chain engine.
//!
//! A [`Rule`] is the declarative policy a transaction is checked against:
//!
//! ```rust
//! use txrule_core::types::{ConstraintKind, Effect, Rule, Target};
//!
//! let json = r#"{
//!     "effect": "allow",
//!     "resource": "ethereum.eth.transfer",
//!     "target": { "address": "0x742d35cc6634c0532925a3b844bc454e4438f44e" },
//!     "parameter_constraints": [
//!         {
//!             "parameter_name": "amount",
//!             "constraint": { "type": "max", "value": "1000000000000000000", "required": true }
//!         }
//!     ]
//! }"#;
//!
//! let rule: Rule = serde_json::from_str(json).unwrap();
//! assert_eq!(rule.effect, Effect::Allow);
//! assert!(matches!(rule.target, Target::Address(_)));
//! assert!(matches!(
//!     rule.parameter_constraints[0].constraint.kind,
//!     ConstraintKind::Max(_)
//! ));
//!
//! let path = rule.resource_path().unwrap();
//! assert_eq!(path.chain_id, "ethereum");
//! assert_eq!(path.protocol_id, "eth");
//! assert_eq!(path.function_id, "transfer");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

// ============================================================================
// Effect
// ============================================================================

/// Whether a rule grants or denies permission.
///
/// Engines only evaluate `Allow` rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// The described transaction shape may be co-signed.
    Allow,
    /// The described transaction shape must not be co-signed.
    Deny,
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("allow"),
            Self::Deny => f.write_str("deny"),
        }
    }
}

// ============================================================================
// MagicConstant
// ============================================================================

/// Symbolic value resolved per `(chain, environment)` at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum MagicConstant {
    /// THORChain inbound vault address.
    ThorchainVault,
    /// THORChain router contract.
    ThorchainRouter,
    /// MayaChain inbound vault address.
    MayachainVault,
    /// MayaChain router contract.
    MayachainRouter,
    /// Treasury address collecting fees.
    VultisigTreasury,
    /// LI.FI diamond router.
    LifiRouter,
    /// 1inch aggregation router.
    OneinchRouter,
}

impl MagicConstant {
    /// All known constants.
    pub const ALL: [Self; 7] = [
        Self::ThorchainVault,
        Self::ThorchainRouter,
        Self::MayachainVault,
        Self::MayachainRouter,
        Self::VultisigTreasury,
        Self::LifiRouter,
        Self::OneinchRouter,
    ];

    /// Returns the stable snake-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ThorchainVault => "thorchain_vault",
            Self::ThorchainRouter => "thorchain_router",
            Self::MayachainVault => "mayachain_vault",
            Self::MayachainRouter => "mayachain_router",
            Self::VultisigTreasury => "vultisig_treasury",
            Self::LifiRouter => "lifi_router",
            Self::OneinchRouter => "oneinch_router",
        }
    }
}

impl fmt::Display for MagicConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MagicConstant {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| PolicyError::rule_shape(format!("unknown magic constant: {s}")))
    }
}

// ============================================================================
// Target
// ============================================================================

/// The contract, program or vault a transaction must interact with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// No target check.
    #[default]
    Unspecified,
    /// A literal address.
    Address(String),
    /// An address resolved from a magic constant.
    MagicConstant(MagicConstant),
}

impl Target {
    /// Returns `true` for [`Target::Unspecified`].
    #[must_use]
    pub const fn is_unspecified(&self) -> bool {
        matches!(self, Self::Unspecified)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => f.write_str("unspecified"),
            Self::Address(addr) => write!(f, "address {addr}"),
            Self::MagicConstant(c) => write!(f, "magic {c}"),
        }
    }
}

// ============================================================================
// Constraint
// ============================================================================

/// The matching operation of a [`Constraint`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Always passes.
    Any,
    /// Value must equal the literal.
    Fixed(String),
    /// Value must be greater than or equal to the literal.
    Min(String),
    /// Value must be less than or equal to the literal.
    Max(String),
    /// Value must equal the resolved constant.
    MagicConstant(MagicConstant),
    /// String value must match the pattern.
    Regexp(String),
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Fixed(v) => write!(f, "fixed {v}"),
            Self::Min(v) => write!(f, "min {v}"),
            Self::Max(v) => write!(f, "max {v}"),
            Self::MagicConstant(c) => write!(f, "magic {c}"),
            Self::Regexp(p) => write!(f, "regexp {p}"),
        }
    }
}

/// A typed condition on one extracted transaction field.
///
/// `required` is informational. Engines decide which parameters must be
/// constrained and reject rules that omit them regardless of this flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// The matching operation.
    #[serde(flatten)]
    pub kind: ConstraintKind,
    /// Informational marker set by rule authors.
    #[serde(default)]
    pub required: bool,
}

impl Constraint {
    /// Create a constraint with `required` set.
    #[must_use]
    pub const fn required(kind: ConstraintKind) -> Self {
        Self {
            kind,
            required: true,
        }
    }

    /// Shorthand for a required `Fixed` constraint.
    #[must_use]
    pub fn fixed(value: impl Into<String>) -> Self {
        Self::required(ConstraintKind::Fixed(value.into()))
    }

    /// Shorthand for a required `Min` constraint.
    #[must_use]
    pub fn min(value: impl Into<String>) -> Self {
        Self::required(ConstraintKind::Min(value.into()))
    }

    /// Shorthand for a required `Max` constraint.
    #[must_use]
    pub fn max(value: impl Into<String>) -> Self {
        Self::required(ConstraintKind::Max(value.into()))
    }

    /// Shorthand for a required `MagicConstant` constraint.
    #[must_use]
    pub const fn magic(constant: MagicConstant) -> Self {
        Self::required(ConstraintKind::MagicConstant(constant))
    }

    /// Shorthand for a required `Regexp` constraint.
    #[must_use]
    pub fn regexp(pattern: impl Into<String>) -> Self {
        Self::required(ConstraintKind::Regexp(pattern.into()))
    }

    /// Shorthand for an `Any` constraint.
    #[must_use]
    pub const fn any() -> Self {
        Self::required(ConstraintKind::Any)
    }
}

/// A constraint bound to an engine-defined parameter name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterConstraint {
    /// Engine-defined key such as `recipient` or `output_value_0`.
    pub parameter_name: String,
    /// The condition to check.
    pub constraint: Constraint,
}

impl ParameterConstraint {
    /// Bind `constraint` to `parameter_name`.
    #[must_use]
    pub fn new(parameter_name: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            parameter_name: parameter_name.into(),
            constraint,
        }
    }
}

// ============================================================================
// ResourcePath
// ============================================================================

/// Parsed form of a rule's `chain.protocol.function` resource string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourcePath {
    /// Chain identifier, e.g. `ethereum`.
    pub chain_id: String,
    /// Protocol identifier, e.g. `eth` or `usdc`.
    pub protocol_id: String,
    /// Function identifier, e.g. `transfer`.
    pub function_id: String,
}

impl ResourcePath {
    /// Parse a `chain.protocol.function` string.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::RuleShape`] for meta-rules (two segments),
    /// empty segments, or any other segment count.
    pub fn parse(resource: &str) -> Result<Self, PolicyError> {
        let parts: Vec<&str> = resource.split('.').collect();
        match parts.as_slice() {
            [chain, protocol, function] => {
                if chain.is_empty() || protocol.is_empty() {
                    return Err(PolicyError::rule_shape(format!(
                        "resource {resource:?} has an empty chain or protocol"
                    )));
                }
                if function.is_empty() {
                    return Err(PolicyError::rule_shape(format!(
                        "resource {resource:?} is an unresolved meta-rule"
                    )));
                }
                Ok(Self {
                    chain_id: (*chain).to_string(),
                    protocol_id: (*protocol).to_string(),
                    function_id: (*function).to_string(),
                })
            }
            [_, _] => Err(PolicyError::rule_shape(format!(
                "resource {resource:?} is an unresolved meta-rule"
            ))),
            _ => Err(PolicyError::rule_shape(format!(
                "resource {resource:?} is not of the form chain.protocol.function"
            ))),
        }
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.chain_id, self.protocol_id, self.function_id)
    }
}

impl FromStr for ResourcePath {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// Rule
// ============================================================================

/// A declarative allow/deny policy for one transaction shape on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Allow or deny.
    pub effect: Effect,
    /// `chain.protocol.function` resource string.
    pub resource: String,
    /// Required destination, if any.
    #[serde(default)]
    pub target: Target,
    /// Conditions on extracted parameters.
    #[serde(default)]
    pub parameter_constraints: Vec<ParameterConstraint>,
}

impl Rule {
    /// Create an `Allow` rule with no target and no constraints.
    #[must_use]
    pub fn allow(resource: impl Into<String>) -> Self {
        Self {
            effect: Effect::Allow,
            resource: resource.into(),
            target: Target::Unspecified,
            parameter_constraints: Vec::new(),
        }
    }

    /// Set the target.
    #[must_use]
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Append a parameter constraint.
    #[must_use]
    pub fn with_constraint(mut self, name: impl Into<String>, constraint: Constraint) -> Self {
        self.parameter_constraints
            .push(ParameterConstraint::new(name, constraint));
        self
    }

    /// Parse the resource string.
    ///
    /// # Errors
    ///
    /// See [`ResourcePath::parse`].
    pub fn resource_path(&self) -> Result<ResourcePath, PolicyError> {
        ResourcePath::parse(&self.resource)
    }

    /// Reject anything but an `Allow` rule.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::RuleShape`] for `Deny` rules.
    pub fn ensure_allow(&self) -> Result<(), PolicyError> {
        match self.effect {
            Effect::Allow => Ok(()),
            Effect::Deny => Err(PolicyError::rule_shape(format!(
                "deny rule for {} submitted for evaluation",
                self.resource
            ))),
        }
    }
}
