//! Error types for the txrule policy core.
//!
//! Errors are organized by domain:
//!
//! - [`PolicyError`] - The outcome of a failed rule evaluation
//! - [`ParseError`] - Low-level decoding failures inside chain decoders
//! - [`ConfigError`] - Configuration loading failures
//!
//! Every [`ParseError`] converts into [`PolicyError::MalformedInput`], so
//! decoders can use `?` freely inside an engine's `evaluate`.
//!
//! # Example
//!
//! ```rust
//! use txrule_core::error::{ErrorKind, ParseError, PolicyError};
//!
//! fn decode(data: &[u8]) -> Result<(), PolicyError> {
//!     if data.is_empty() {
//!         return Err(ParseError::malformed_transaction("empty transaction data").into());
//!     }
//!     Ok(())
//! }
//!
//! let err = decode(&[]).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::MalformedInput);
//! ```

use std::fmt;

// ============================================================================
// ErrorKind
// ============================================================================

/// Fieldless classification of a [`PolicyError`].
///
/// Callers that only need to branch on the category of a failure (exit codes,
/// metrics labels, tests) match on this instead of the full error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The transaction bytes could not be decoded, or are empty or oversized.
    MalformedInput,
    /// Wrong message, instruction, contract or output count.
    StructuralViolation,
    /// Unknown chain, protocol or function, or an unsupported message kind.
    UnsupportedProtocol,
    /// The transaction does not interact with the rule's target.
    TargetMismatch,
    /// A parameter constraint comparison failed.
    ConstraintViolation,
    /// The rule itself cannot be evaluated by the engine.
    RuleShape,
}

impl ErrorKind {
    /// Returns the snake-case label for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MalformedInput => "malformed_input",
            Self::StructuralViolation => "structural_violation",
            Self::UnsupportedProtocol => "unsupported_protocol",
            Self::TargetMismatch => "target_mismatch",
            Self::ConstraintViolation => "constraint_violation",
            Self::RuleShape => "rule_shape",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// PolicyError
// ============================================================================

/// Terminal failure of a rule evaluation.
///
/// There is no partial success: an engine returns the first violation it
/// encounters and never retries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// Hex, RLP, protobuf or Borsh decoding failed, or the payload size is invalid.
    #[error("malformed input: {context}")]
    MalformedInput {
        /// What failed to decode.
        context: String,
    },

    /// The transaction has the wrong shape for the rule.
    #[error("structural violation: {context}")]
    StructuralViolation {
        /// Description of the violated structure.
        context: String,
    },

    /// The chain, protocol, function or message kind is not supported.
    #[error("unsupported protocol: {context}")]
    UnsupportedProtocol {
        /// The unsupported identifier.
        context: String,
    },

    /// The resolved target does not equal the transaction's destination.
    #[error("target mismatch: expected {expected}, got {actual}")]
    TargetMismatch {
        /// Target required by the rule.
        expected: String,
        /// Destination found in the transaction.
        actual: String,
    },

    /// A Fixed, Min, Max, Magic or Regexp comparison failed.
    #[error("constraint violation on {parameter}: expected {expected}, got {actual}")]
    ConstraintViolation {
        /// The parameter name the constraint applies to.
        parameter: String,
        /// Human-readable form of the constraint.
        expected: String,
        /// The value extracted from the transaction.
        actual: String,
    },

    /// The rule cannot be evaluated as written.
    #[error("invalid rule: {context}")]
    RuleShape {
        /// Why the rule was rejected.
        context: String,
    },

    /// The magic constant resolver has no value for this constant.
    #[error("unresolved magic constant {constant} for chain {chain} in environment {environment}")]
    UnresolvedConstant {
        /// The symbolic constant id.
        constant: String,
        /// The chain the constant was requested for.
        chain: String,
        /// The environment tag used for resolution.
        environment: String,
    },
}

impl PolicyError {
    /// Create a `MalformedInput` error.
    #[must_use]
    pub fn malformed(context: impl Into<String>) -> Self {
        Self::MalformedInput {
            context: context.into(),
        }
    }

    /// Create a `StructuralViolation` error.
    #[must_use]
    pub fn structural(context: impl Into<String>) -> Self {
        Self::StructuralViolation {
            context: context.into(),
        }
    }

    /// Create an `UnsupportedProtocol` error.
    #[must_use]
    pub fn unsupported(context: impl Into<String>) -> Self {
        Self::UnsupportedProtocol {
            context: context.into(),
        }
    }

    /// Create a `TargetMismatch` error.
    #[must_use]
    pub fn target_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TargetMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a `ConstraintViolation` error.
    #[must_use]
    pub fn constraint(
        parameter: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ConstraintViolation {
            parameter: parameter.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a `RuleShape` error.
    #[must_use]
    pub fn rule_shape(context: impl Into<String>) -> Self {
        Self::RuleShape {
            context: context.into(),
        }
    }

    /// Create an `UnresolvedConstant` error.
    #[must_use]
    pub fn unresolved(
        constant: impl Into<String>,
        chain: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self::UnresolvedConstant {
            constant: constant.into(),
            chain: chain.into(),
            environment: environment.into(),
        }
    }

    /// Classify this error.
    ///
    /// A constant the resolver cannot supply is a rule problem: the rule
    /// references a symbol that does not exist for its chain.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedInput { .. } => ErrorKind::MalformedInput,
            Self::StructuralViolation { .. } => ErrorKind::StructuralViolation,
            Self::UnsupportedProtocol { .. } => ErrorKind::UnsupportedProtocol,
            Self::TargetMismatch { .. } => ErrorKind::TargetMismatch,
            Self::ConstraintViolation { .. } => ErrorKind::ConstraintViolation,
            Self::RuleShape { .. } | Self::UnresolvedConstant { .. } => ErrorKind::RuleShape,
        }
    }
}

impl From<ParseError> for PolicyError {
    fn from(err: ParseError) -> Self {
        Self::MalformedInput {
            context: err.to_string(),
        }
    }
}

// ============================================================================
// ParseError
// ============================================================================

/// Errors raised while decoding raw transaction bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The input is not valid hexadecimal.
    #[error("invalid hex: {context}")]
    InvalidHex {
        /// Decoder message.
        context: String,
    },

    /// RLP decoding failed.
    #[error("RLP decoding failed: {context}")]
    InvalidRlp {
        /// Context about the RLP failure.
        context: String,
    },

    /// Protobuf decoding failed.
    #[error("protobuf decoding failed: {context}")]
    InvalidProtobuf {
        /// Context about the protobuf failure.
        context: String,
    },

    /// The transaction is structurally malformed.
    #[error("malformed transaction: {context}")]
    MalformedTransaction {
        /// What is wrong with the transaction.
        context: String,
    },

    /// Contract call data could not be decoded.
    #[error("malformed calldata: {context}")]
    MalformedCalldata {
        /// What is wrong with the call data.
        context: String,
    },

    /// An address could not be decoded.
    #[error("invalid address: {address}")]
    InvalidAddress {
        /// The offending address or a description of it.
        address: String,
    },
}

impl ParseError {
    /// Create an `InvalidHex` error.
    #[must_use]
    pub fn invalid_hex(context: impl Into<String>) -> Self {
        Self::InvalidHex {
            context: context.into(),
        }
    }

    /// Create an `InvalidRlp` error.
    #[must_use]
    pub fn invalid_rlp(context: impl Into<String>) -> Self {
        Self::InvalidRlp {
            context: context.into(),
        }
    }

    /// Create an `InvalidProtobuf` error.
    #[must_use]
    pub fn invalid_protobuf(context: impl Into<String>) -> Self {
        Self::InvalidProtobuf {
            context: context.into(),
        }
    }

    /// Create a `MalformedTransaction` error.
    #[must_use]
    pub fn malformed_transaction(context: impl Into<String>) -> Self {
        Self::MalformedTransaction {
            context: context.into(),
        }
    }

    /// Create a `MalformedCalldata` error.
    #[must_use]
    pub fn malformed_calldata(context: impl Into<String>) -> Self {
        Self::MalformedCalldata {
            context: context.into(),
        }
    }

    /// Create an `InvalidAddress` error.
    #[must_use]
    pub fn invalid_address(address: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
        }
    }
}

// ============================================================================
// ConfigError
// ============================================================================

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {context}")]
    ParseFailed {
        /// Context about the parsing failure.
        context: String,
    },

    /// A configuration value is invalid.
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// The field name with the invalid value.
        field: String,
        /// The invalid value.
        value: String,
    },

    /// The home directory could not be determined.
    #[error("could not determine home directory")]
    NoHomeDirectory,

    /// An I/O error occurred.
    #[error("{context}: {source}")]
    Io {
        /// What was being done when the error occurred.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create a `FileNotFound` error.
    #[must_use]
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a `ParseFailed` error.
    #[must_use]
    pub fn parse_failed(context: impl Into<String>) -> Self {
        Self::ParseFailed {
            context: context.into(),
        }
    }

    /// Create an `InvalidValue` error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a `NoHomeDirectory` error.
    #[must_use]
    pub const fn no_home_directory() -> Self {
        Self::NoHomeDirectory
    }

    /// Create an `Io` error with context.
    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

// ============================================================================
// Result type aliases
// ============================================================================

/// A `Result` type alias for rule evaluation.
pub type PolicyResult<T> = std::result::Result<T, PolicyError>;

/// A `Result` type alias for decoding operations.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// A `Result` type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ============================================================================
// Unit Tests
// ============================================================================
