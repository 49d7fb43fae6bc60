//! EVM engine.
//!
//! One [`EvmChain`] serves one EVM network. Protocol ids in resource strings
//! resolve, in order, to the native currency, a token from the chain's token
//! list, or a loaded ABI. Anything else is an unsupported protocol.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use txrule_chain::evm::EvmChain;
//! use txrule_chain::Engine;
//! use txrule_core::StaticResolver;
//!
//! let chain = EvmChain::new("ethereum", 1, "ETH", Arc::new(StaticResolver::new()));
//! assert_eq!(chain.id(), "ethereum");
//! assert!(chain.get_protocol("eth").is_ok());
//! assert!(chain.get_protocol("nope").is_err());
//! ```

pub mod abi;
pub mod erc20;
pub mod protocol;
pub mod rlp;
pub mod tokens;
pub mod transaction;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use txrule_core::config::EvmChainConfig;
use txrule_core::config_loader::read_asset;
use txrule_core::error::ConfigError;
use txrule_core::{ArgContext, MagicConstantResolver, PolicyError, Rule};

pub use abi::AbiProtocol;
pub use erc20::{decode_erc20_call, Erc20Call, Erc20Protocol};
pub use protocol::{EvmAddressCompare, EvmProtocol, NativeProtocol, PolicyMatcher};
pub use tokens::{TokenInfo, TokenList};
pub use transaction::{
    compute_tx_hash, decode_unsigned, parse_transaction, EvmTransaction, TxSignature,
};

use crate::engine::{prepare, Engine};

/// An EVM network with its native currency, tokens and contract ABIs.
#[derive(Clone)]
pub struct EvmChain {
    id: String,
    chain_id: u64,
    native: Arc<NativeProtocol>,
    tokens: HashMap<String, Arc<Erc20Protocol>>,
    abis: HashMap<String, Arc<AbiProtocol>>,
    resolver: Arc<dyn MagicConstantResolver>,
}

impl fmt::Debug for EvmChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmChain")
            .field("id", &self.id)
            .field("chain_id", &self.chain_id)
            .field("native", &self.native.symbol())
            .field("tokens", &self.tokens.len())
            .field("abis", &self.abis.len())
            .finish_non_exhaustive()
    }
}

impl EvmChain {
    /// A chain with only its native currency registered.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        chain_id: u64,
        native_symbol: impl Into<String>,
        resolver: Arc<dyn MagicConstantResolver>,
    ) -> Self {
        Self {
            id: id.into().to_ascii_lowercase(),
            chain_id,
            native: Arc::new(NativeProtocol::new(native_symbol, chain_id)),
            tokens: HashMap::new(),
            abis: HashMap::new(),
            resolver,
        }
    }

    /// Register every token in `list` as an ERC-20 protocol.
    #[must_use]
    pub fn with_tokens(mut self, list: &TokenList) -> Self {
        for (address, info) in list.iter() {
            self.tokens.insert(
                info.symbol.to_ascii_lowercase(),
                Arc::new(Erc20Protocol::new(info.symbol.clone(), address)),
            );
        }
        self
    }

    /// Register a contract ABI under its name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the name is already taken.
    pub fn register_abi(&mut self, protocol: AbiProtocol) -> Result<(), ConfigError> {
        let key = protocol.id().to_ascii_lowercase();
        if self.abis.contains_key(&key) {
            return Err(ConfigError::invalid_value("abi name", protocol.id()));
        }
        self.abis.insert(key, Arc::new(protocol));
        Ok(())
    }

    /// Build a chain from configuration, reading its token list and ABIs.
    ///
    /// Ethereum mainnet falls back to the built-in token list when none is
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when an asset cannot be read or parsed.
    pub fn from_config(
        config: &EvmChainConfig,
        resolver: Arc<dyn MagicConstantResolver>,
    ) -> Result<Self, ConfigError> {
        let mut chain = Self::new(
            config.id.clone(),
            config.chain_id,
            config.native_symbol.clone(),
            resolver,
        );

        let tokens = match &config.token_list {
            Some(path) => TokenList::from_json(&read_asset(path)?)?,
            None if config.chain_id == 1 => TokenList::ethereum_mainnet(),
            None => TokenList::new(),
        };
        chain = chain.with_tokens(&tokens);

        for abi in &config.abis {
            let json = read_asset(&abi.path)?;
            let protocol = AbiProtocol::from_json(abi.name.clone(), &json)
                .map_err(|e| ConfigError::parse_failed(e.to_string()))?;
            chain.register_abi(protocol)?;
        }

        tracing::debug!(
            chain = %chain.id,
            tokens = chain.tokens.len(),
            abis = chain.abis.len(),
            "loaded EVM chain"
        );
        Ok(chain)
    }

    /// EIP-155 chain id.
    #[must_use]
    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Resolve a protocol id (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::UnsupportedProtocol`] for an unknown id.
    pub fn get_protocol(&self, id: &str) -> Result<Arc<dyn EvmProtocol>, PolicyError> {
        let key = id.to_ascii_lowercase();
        if self.native.symbol().eq_ignore_ascii_case(&key) {
            return Ok(self.native.clone());
        }
        if let Some(token) = self.tokens.get(&key) {
            return Ok(token.clone());
        }
        if let Some(abi) = self.abis.get(&key) {
            return Ok(abi.clone());
        }
        Err(PolicyError::unsupported(format!(
            "protocol {id} is not known on {}",
            self.id
        )))
    }
}

impl Engine for EvmChain {
    fn id(&self) -> &str {
        &self.id
    }

    fn evaluate(&self, rule: &Rule, tx: &[u8]) -> Result<(), PolicyError> {
        let path = prepare(rule, &self.id)?;
        tracing::debug!(chain = %self.id, resource = %path, "evaluating EVM rule");

        let decoded = decode_unsigned(tx)?;
        if decoded.chain_id != self.chain_id {
            return Err(PolicyError::structural(format!(
                "transaction is for chain id {}, {} is {}",
                decoded.chain_id, self.id, self.chain_id
            )));
        }

        let protocol = self.get_protocol(&path.protocol_id)?;
        let ctx = ArgContext::new(&self.id, self.resolver.as_ref());
        let matcher = PolicyMatcher {
            resource: Some(&path),
            target: &rule.target,
            constraints: &rule.parameter_constraints,
        };

        let outcome = protocol
            .match_function_call(&ctx, &matcher, &decoded)
            .and_then(|matched| {
                if matched {
                    Ok(())
                } else {
                    Err(PolicyError::structural(format!(
                        "transaction is not a {path} call"
                    )))
                }
            });

        if let Err(e) = &outcome {
            tracing::warn!(chain = %self.id, resource = %path, error = %e, "rule denied");
        }
        outcome
    }
}
