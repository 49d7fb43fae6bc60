//! Magic constant resolution.
//!
//! Rules may name a [`MagicConstant`] instead of a literal address. Engines
//! resolve it through a [`MagicConstantResolver`] supplied at construction,
//! always in the [`DEFAULT_ENVIRONMENT`]. A resolver that does not know a
//! constant for the requested chain must return an error; engines never fall
//! back to a default value.

use std::collections::{BTreeMap, HashMap};

use crate::config::Config;
use crate::error::{ConfigError, PolicyError};
use crate::types::MagicConstant;

/// Environment tag used by every engine.
pub const DEFAULT_ENVIRONMENT: &str = "default";

/// A resolved constant value plus free-form metadata from the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConstant {
    /// The concrete value, usually an address.
    pub value: String,
    /// Resolver-specific details (source, expiry, ...).
    pub metadata: BTreeMap<String, String>,
}

impl ResolvedConstant {
    /// A value with no metadata.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            metadata: BTreeMap::new(),
        }
    }
}

/// Resolves symbolic constants to concrete values.
///
/// Implementations must be pure with respect to their inputs for the duration
/// of an evaluation.
pub trait MagicConstantResolver: Send + Sync {
    /// Resolve `constant` for `chain` in `environment`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::UnresolvedConstant`] when no value is known.
    fn resolve(
        &self,
        constant: MagicConstant,
        chain: &str,
        environment: &str,
    ) -> Result<ResolvedConstant, PolicyError>;
}

/// Table-backed resolver serving a single environment.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    entries: HashMap<(MagicConstant, String), String>,
}

impl StaticResolver {
    /// An empty resolver. Every lookup fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value for `(constant, chain)`.
    #[must_use]
    pub fn with(mut self, constant: MagicConstant, chain: &str, value: impl Into<String>) -> Self {
        self.insert(constant, chain, value);
        self
    }

    /// Add a value for `(constant, chain)`, replacing any previous one.
    pub fn insert(&mut self, constant: MagicConstant, chain: &str, value: impl Into<String>) {
        self.entries
            .insert((constant, chain.to_ascii_lowercase()), value.into());
    }

    /// Build from the `[magic_constants]` section of a [`Config`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unknown constant id.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut resolver = Self::new();
        for (id, chains) in &config.magic_constants {
            let constant: MagicConstant = id
                .parse()
                .map_err(|_| ConfigError::invalid_value("magic_constants", id.clone()))?;
            for (chain, value) in chains {
                resolver.insert(constant, chain, value.clone());
            }
        }
        Ok(resolver)
    }

    /// Number of `(constant, chain)` entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MagicConstantResolver for StaticResolver {
    fn resolve(
        &self,
        constant: MagicConstant,
        chain: &str,
        environment: &str,
    ) -> Result<ResolvedConstant, PolicyError> {
        if environment != DEFAULT_ENVIRONMENT {
            return Err(PolicyError::unresolved(constant.as_str(), chain, environment));
        }
        let value = self
            .entries
            .get(&(constant, chain.to_ascii_lowercase()))
            .ok_or_else(|| PolicyError::unresolved(constant.as_str(), chain, environment))?;

        let mut resolved = ResolvedConstant::new(value.clone());
        resolved
            .metadata
            .insert("source".to_string(), "static".to_string());
        Ok(resolved)
    }
}
