//! Engine registry for runtime chain lookup.
//!
//! [`EngineRegistry`] maps a chain id to the [`Engine`] evaluating its
//! transactions. Registries are filled once at start-up and only read
//! afterwards; cloning shares the underlying map.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use txrule_chain::EngineRegistry;
//! use txrule_core::StaticResolver;
//!
//! let registry = EngineRegistry::with_defaults(Arc::new(StaticResolver::new()));
//! assert!(registry.supports("ethereum"));
//! assert!(registry.supports("gaia"));
//! assert!(!registry.supports("unknown"));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use txrule_core::config::{Config, EvmChainConfig};
use txrule_core::error::ConfigError;
use txrule_core::{MagicConstantResolver, PolicyError, Rule};

use crate::cosmos::{CosmosChain, CosmosParams};
use crate::engine::Engine;
use crate::evm::{EvmChain, TokenList};
use crate::solana::SolanaChain;
use crate::tron::TronChain;
use crate::utxo::{UtxoChain, UtxoNetwork};

/// Registry of chain engines keyed by lower-case chain id.
#[derive(Clone, Default)]
pub struct EngineRegistry {
    engines: Arc<HashMap<String, Arc<dyn Engine>>>,
}

impl EngineRegistry {
    /// An empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every built-in engine with default parameters:
    ///
    /// - EVM: ethereum, arbitrum, base, optimism, polygon, bsc, avalanche
    /// - UTXO: bitcoin, litecoin, dogecoin
    /// - Cosmos family: thorchain, mayachain, gaia
    /// - tron
    /// - solana, with the System Program only
    #[must_use]
    pub fn with_defaults(resolver: Arc<dyn MagicConstantResolver>) -> Self {
        let mut registry = Self::empty();
        for chain in Config::default().evm_chains {
            registry.insert(Arc::new(default_evm_chain(&chain, Arc::clone(&resolver))));
        }
        registry.insert_builtin(&resolver, Config::default().evaluation.max_tx_bytes);
        registry.insert(Arc::new(SolanaChain::new(resolver)));
        registry
    }

    /// Build every engine described by `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration fails validation or an
    /// ABI, token list or IDL cannot be loaded.
    pub fn from_config(
        config: &Config,
        resolver: Arc<dyn MagicConstantResolver>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut registry = Self::empty();
        for chain in &config.evm_chains {
            registry.register(EvmChain::from_config(chain, Arc::clone(&resolver))?)?;
        }
        registry.insert_builtin(&resolver, config.evaluation.max_tx_bytes);
        registry.register(SolanaChain::from_config(&config.solana_idls, resolver)?)?;

        tracing::info!(chains = ?registry.supported_chains(), "engine registry ready");
        Ok(registry)
    }

    fn insert_builtin(&mut self, resolver: &Arc<dyn MagicConstantResolver>, max_tx_bytes: usize) {
        for network in UtxoNetwork::ALL {
            self.insert(Arc::new(UtxoChain::new(network, Arc::clone(resolver))));
        }
        for params in [CosmosParams::THORCHAIN, CosmosParams::MAYACHAIN, CosmosParams::GAIA] {
            self.insert(Arc::new(
                CosmosChain::new(params, Arc::clone(resolver)).with_max_tx_bytes(max_tx_bytes),
            ));
        }
        self.insert(Arc::new(
            TronChain::new(Arc::clone(resolver)).with_max_tx_bytes(max_tx_bytes),
        ));
    }

    fn insert(&mut self, engine: Arc<dyn Engine>) {
        Arc::make_mut(&mut self.engines).insert(engine.id().to_ascii_lowercase(), engine);
    }

    /// Register an engine.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if an engine with the same chain
    /// id is already registered.
    pub fn register<E: Engine + 'static>(&mut self, engine: E) -> Result<(), ConfigError> {
        let id = engine.id().to_ascii_lowercase();
        if self.engines.contains_key(&id) {
            return Err(ConfigError::invalid_value("engines", id));
        }
        Arc::make_mut(&mut self.engines).insert(id, Arc::new(engine));
        Ok(())
    }

    /// Look up an engine by chain id (case-insensitive).
    #[must_use]
    pub fn get(&self, chain_id: &str) -> Option<&dyn Engine> {
        self.engines
            .get(&chain_id.to_ascii_lowercase())
            .map(Arc::as_ref)
    }

    /// Returns `true` if `chain_id` has an engine.
    #[must_use]
    pub fn supports(&self, chain_id: &str) -> bool {
        self.get(chain_id).is_some()
    }

    /// Sorted list of registered chain ids.
    #[must_use]
    pub fn supported_chains(&self) -> Vec<&str> {
        let mut chains: Vec<&str> = self.engines.keys().map(String::as_str).collect();
        chains.sort_unstable();
        chains
    }

    /// Number of registered engines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.engines.len()
    }

    /// Returns `true` if no engine is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Dispatch `rule` to the engine named by its resource.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::RuleShape`] for a malformed resource,
    /// [`PolicyError::UnsupportedProtocol`] for an unknown chain, and
    /// otherwise whatever the engine returns.
    pub fn evaluate(&self, rule: &Rule, tx: &[u8]) -> Result<(), PolicyError> {
        let path = rule.resource_path()?;
        let engine = self.get(&path.chain_id).ok_or_else(|| {
            PolicyError::unsupported(format!("no engine for chain {}", path.chain_id))
        })?;
        engine.evaluate(rule, tx)
    }
}

fn default_evm_chain(
    config: &EvmChainConfig,
    resolver: Arc<dyn MagicConstantResolver>,
) -> EvmChain {
    let chain = EvmChain::new(
        config.id.clone(),
        config.chain_id,
        config.native_symbol.clone(),
        resolver,
    );
    if config.chain_id == 1 {
        chain.with_tokens(&TokenList::ethereum_mainnet())
    } else {
        chain
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("chains", &self.supported_chains())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::needless_raw_string_hashes)]

    use super::*;
    use txrule_core::config::IdlConfig;
    use txrule_core::{ErrorKind, StaticResolver};

    struct FixedEngine {
        id: &'static str,
        allow: bool,
    }

    impl Engine for FixedEngine {
        fn id(&self) -> &str {
            self.id
        }

        fn evaluate(&self, _rule: &Rule, _tx: &[u8]) -> Result<(), PolicyError> {
            if self.allow {
                Ok(())
            } else {
                Err(PolicyError::structural("fixed deny"))
            }
        }
    }

    fn resolver() -> Arc<dyn MagicConstantResolver> {
        Arc::new(StaticResolver::new())
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    #[test]
    fn test_with_defaults() {
        let registry = EngineRegistry::with_defaults(resolver());
        assert_eq!(
            registry.supported_chains(),
            vec![
                "arbitrum",
                "avalanche",
                "base",
                "bitcoin",
                "bsc",
                "dogecoin",
                "ethereum",
                "gaia",
                "litecoin",
                "mayachain",
                "optimism",
                "polygon",
                "solana",
                "thorchain",
                "tron",
            ]
        );
    }

    #[test]
    fn test_empty() {
        let registry = EngineRegistry::empty();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.get("ethereum").is_none());
    }

    #[test]
    fn test_from_config_matches_defaults() {
        let registry = EngineRegistry::from_config(&Config::default(), resolver()).unwrap();
        let defaults = EngineRegistry::with_defaults(resolver());
        assert_eq!(registry.supported_chains(), defaults.supported_chains());
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = Config::default();
        config.evaluation.max_tx_bytes = 0;
        assert!(EngineRegistry::from_config(&config, resolver()).is_err());

        let mut config = Config::default();
        config.solana_idls.push(IdlConfig {
            name: "missing".into(),
            path: "/nonexistent/idl.json".into(),
        });
        assert!(EngineRegistry::from_config(&config, resolver()).is_err());
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = EngineRegistry::empty();
        registry
            .register(FixedEngine { id: "test", allow: true })
            .unwrap();
        let err = registry
            .register(FixedEngine { id: "TEST", allow: false })
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_clone_shares_engines() {
        let mut registry = EngineRegistry::empty();
        registry
            .register(FixedEngine { id: "test", allow: true })
            .unwrap();
        let clone = registry.clone();
        std::thread::spawn(move || assert!(clone.supports("Test")))
            .join()
            .unwrap();
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    #[test]
    fn test_evaluate_dispatches_by_chain() {
        let mut registry = EngineRegistry::empty();
        registry
            .register(FixedEngine { id: "yes", allow: true })
            .unwrap();
        registry
            .register(FixedEngine { id: "no", allow: false })
            .unwrap();

        registry.evaluate(&Rule::allow("yes.p.f"), &[1]).unwrap();
        let err = registry.evaluate(&Rule::allow("no.p.f"), &[1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralViolation);
        let err = registry.evaluate(&Rule::allow("maybe.p.f"), &[1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedProtocol);
    }

    #[test]
    fn test_evaluate_rejects_meta_rule() {
        let registry = EngineRegistry::with_defaults(resolver());
        let err = registry
            .evaluate(&Rule::allow("ethereum.eth"), &[1])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RuleShape);
    }
}
