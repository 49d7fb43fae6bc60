//! Configuration types for the txrule policy core.
//!
//! Configuration describes what engines are constructed with: EVM chain
//! parameters, ABI and IDL files, token lists, and the magic constant table.
//! Everything here is read once at start-up; evaluation never touches it.
//!
//! # Configuration File
//!
//! Configuration is stored in TOML format at `~/.txrule/config.toml`.
//!
//! ```
//! use txrule_core::config::Config;
//!
//! let config = Config::default();
//! assert_eq!(config.evaluation.max_tx_bytes, 32 * 1024);
//! assert!(config.evm_chain("ethereum").is_some());
//!
//! let parsed: Config = toml::from_str(&Config::default_toml()).unwrap();
//! assert_eq!(parsed, config);
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::MagicConstant;

/// Default cap on protobuf-encoded transaction size.
pub const DEFAULT_MAX_TX_BYTES: usize = 32 * 1024;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Evaluation limits.
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// `constant id -> chain id -> value`.
    #[serde(default)]
    pub magic_constants: BTreeMap<String, BTreeMap<String, String>>,

    /// EVM chains to register.
    #[serde(default = "default_evm_chains")]
    pub evm_chains: Vec<EvmChainConfig>,

    /// Solana program IDLs to load.
    #[serde(default)]
    pub solana_idls: Vec<IdlConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            evaluation: EvaluationConfig::default(),
            magic_constants: BTreeMap::new(),
            evm_chains: default_evm_chains(),
            solana_idls: Vec::new(),
        }
    }
}

/// Evaluation limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluationConfig {
    /// Maximum accepted size of Cosmos-family and Tron transactions.
    #[serde(default = "default_max_tx_bytes")]
    pub max_tx_bytes: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            max_tx_bytes: DEFAULT_MAX_TX_BYTES,
        }
    }
}

const fn default_max_tx_bytes() -> usize {
    DEFAULT_MAX_TX_BYTES
}

/// One EVM chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvmChainConfig {
    /// Chain id used in resource strings, e.g. `ethereum`.
    pub id: String,
    /// EIP-155 numeric chain id.
    pub chain_id: u64,
    /// Native currency symbol, e.g. `ETH`.
    pub native_symbol: String,
    /// Optional JSON token list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_list: Option<String>,
    /// Contract ABIs addressable as protocols.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub abis: Vec<AbiConfig>,
}

impl EvmChainConfig {
    /// A chain with no token list and no ABIs.
    #[must_use]
    pub fn new(id: &str, chain_id: u64, native_symbol: &str) -> Self {
        Self {
            id: id.to_string(),
            chain_id,
            native_symbol: native_symbol.to_string(),
            token_list: None,
            abis: Vec::new(),
        }
    }
}

/// A named contract ABI file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AbiConfig {
    /// Protocol id the ABI is registered under.
    pub name: String,
    /// Path to the JSON ABI.
    pub path: String,
}

/// A named Solana IDL file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdlConfig {
    /// Protocol id the IDL is registered under.
    pub name: String,
    /// Path to the JSON IDL.
    pub path: String,
}

fn default_evm_chains() -> Vec<EvmChainConfig> {
    vec![
        EvmChainConfig::new("ethereum", 1, "ETH"),
        EvmChainConfig::new("arbitrum", 42_161, "ETH"),
        EvmChainConfig::new("base", 8_453, "ETH"),
        EvmChainConfig::new("optimism", 10, "ETH"),
        EvmChainConfig::new("polygon", 137, "POL"),
        EvmChainConfig::new("bsc", 56, "BNB"),
        EvmChainConfig::new("avalanche", 43_114, "AVAX"),
    ]
}

impl Config {
    /// Look up an EVM chain by id (case-insensitive).
    #[must_use]
    pub fn evm_chain(&self, id: &str) -> Option<&EvmChainConfig> {
        self.evm_chains
            .iter()
            .find(|c| c.id.eq_ignore_ascii_case(id))
    }

    /// Check cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a zero size cap, an empty or
    /// duplicate chain id, an empty native symbol, a duplicate ABI or IDL
    /// name, or an unknown magic constant id.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.evaluation.max_tx_bytes == 0 {
            return Err(ConfigError::invalid_value("evaluation.max_tx_bytes", "0"));
        }

        let mut ids = HashSet::new();
        for chain in &self.evm_chains {
            if chain.id.is_empty() {
                return Err(ConfigError::invalid_value("evm_chains.id", "\"\""));
            }
            if !ids.insert(chain.id.to_ascii_lowercase()) {
                return Err(ConfigError::invalid_value("evm_chains.id", chain.id.clone()));
            }
            if chain.native_symbol.is_empty() {
                return Err(ConfigError::invalid_value(
                    format!("evm_chains.{}.native_symbol", chain.id),
                    "\"\"",
                ));
            }
            let mut abi_names = HashSet::new();
            for abi in &chain.abis {
                if !abi_names.insert(abi.name.to_ascii_lowercase()) {
                    return Err(ConfigError::invalid_value(
                        format!("evm_chains.{}.abis.name", chain.id),
                        abi.name.clone(),
                    ));
                }
            }
        }

        let mut idl_names = HashSet::new();
        for idl in &self.solana_idls {
            if !idl_names.insert(idl.name.to_ascii_lowercase()) {
                return Err(ConfigError::invalid_value("solana_idls.name", idl.name.clone()));
            }
        }

        for id in self.magic_constants.keys() {
            if id.parse::<MagicConstant>().is_err() {
                return Err(ConfigError::invalid_value("magic_constants", id.clone()));
            }
        }

        Ok(())
    }

    /// The default configuration as commented TOML.
    #[must_use]
    pub fn default_toml() -> String {
        r#"[evaluation]
# Size cap for Cosmos-family and Tron transactions, in bytes.
max_tx_bytes = 32768

# Magic constants, resolved per chain.
# [magic_constants.thorchain_router]
# ethereum = "0xD37BbE5744D730a1d98d8DC97c42F0Ca46aD7146"

[[evm_chains]]
id = "ethereum"
chain_id = 1
native_symbol = "ETH"
# token_list = "~/.txrule/tokens/ethereum.json"
# abis = [{ name = "oneinch", path = "~/.txrule/abi/oneinch.json" }]

[[evm_chains]]
id = "arbitrum"
chain_id = 42161
native_symbol = "ETH"

[[evm_chains]]
id = "base"
chain_id = 8453
native_symbol = "ETH"

[[evm_chains]]
id = "optimism"
chain_id = 10
native_symbol = "ETH"

[[evm_chains]]
id = "polygon"
chain_id = 137
native_symbol = "POL"

[[evm_chains]]
id = "bsc"
chain_id = 56
native_symbol = "BNB"

[[evm_chains]]
id = "avalanche"
chain_id = 43114
native_symbol = "AVAX"

# [[solana_idls]]
# name = "jupiter"
# path = "~/.txrule/idl/jupiter.json"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn test_default_toml_round_trips() {
        let parsed: Config = toml::from_str(&Config::default_toml()).expect("valid TOML");
        assert_eq!(parsed, Config::default());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let parsed: Config = toml::from_str("").expect("valid TOML");
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_custom_chain_replaces_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [[evm_chains]]
            id = "sepolia"
            chain_id = 11155111
            native_symbol = "ETH"
            abis = [{ name = "router", path = "/tmp/router.json" }]
            "#,
        )
        .unwrap();
        assert_eq!(parsed.evm_chains.len(), 1);
        assert_eq!(parsed.evm_chain("SEPOLIA").unwrap().abis[0].name, "router");
        assert!(parsed.evm_chain("ethereum").is_none());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut config = Config::default();
        config.evm_chains.push(EvmChainConfig::new("Ethereum", 1, "ETH"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_cap() {
        let mut config = Config::default();
        config.evaluation.max_tx_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_constant() {
        let mut config = Config::default();
        config
            .magic_constants
            .insert("mystery".to_string(), BTreeMap::new());
        assert!(config.validate().is_err());
    }
}
