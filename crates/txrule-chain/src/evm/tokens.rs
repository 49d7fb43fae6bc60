//! Per-chain token lists.
//!
//! Token lists are JSON objects keyed by contract address:
//!
//! ```json
//! {
//!   "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48": {
//!     "symbol": "USDC",
//!     "decimals": 6,
//!     "name": "USD Coin"
//!   }
//! }
//! ```
//!
//! Resource strings name tokens by symbol, so the list is indexed by
//! lower-cased symbol.

use std::collections::{BTreeMap, HashMap};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use txrule_core::error::ConfigError;

/// Metadata for one token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Token symbol (e.g. "USDC").
    pub symbol: String,

    /// Decimal places.
    #[serde(default)]
    pub decimals: u8,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TokenInfo {
    /// Create token metadata.
    #[must_use]
    pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
            name: None,
        }
    }
}

/// Tokens known on one EVM chain.
#[derive(Debug, Clone, Default)]
pub struct TokenList {
    by_symbol: HashMap<String, (Address, TokenInfo)>,
}

impl TokenList {
    /// Empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mainnet Ethereum stablecoins and wrapped assets.
    #[must_use]
    pub fn ethereum_mainnet() -> Self {
        let mut list = Self::new();
        for (addr, symbol, decimals) in [
            ("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", "USDC", 6),
            ("0xdAC17F958D2ee523a2206206994597C13D831ec7", "USDT", 6),
            ("0x6B175474E89094C44Da98b954EedfcE8F7e08E8A", "DAI", 18),
            ("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", "WETH", 18),
            ("0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599", "WBTC", 8),
        ] {
            if let Ok(address) = addr.parse::<Address>() {
                // Symbols above are distinct.
                let _ = list.register(address, TokenInfo::new(symbol, decimals));
            }
        }
        list
    }

    /// Add a token.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the symbol is already taken.
    pub fn register(&mut self, address: Address, info: TokenInfo) -> Result<(), ConfigError> {
        let key = info.symbol.to_ascii_lowercase();
        if self.by_symbol.contains_key(&key) {
            return Err(ConfigError::invalid_value("token symbol", info.symbol));
        }
        self.by_symbol.insert(key, (address, info));
        Ok(())
    }

    /// Look up a token by symbol (case-insensitive).
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<(Address, &TokenInfo)> {
        self.by_symbol
            .get(&symbol.to_ascii_lowercase())
            .map(|(addr, info)| (*addr, info))
    }

    /// Iterate over `(address, info)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Address, &TokenInfo)> {
        self.by_symbol.values().map(|(addr, info)| (*addr, info))
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    /// True when no tokens are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }

    /// Parse an address-keyed JSON token list.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseFailed`] for malformed JSON and
    /// [`ConfigError::InvalidValue`] for a bad address or a duplicate symbol.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: BTreeMap<String, TokenInfo> = serde_json::from_str(json)
            .map_err(|e| ConfigError::parse_failed(format!("token list: {e}")))?;

        let mut list = Self::new();
        for (addr, info) in raw {
            let address = addr
                .parse::<Address>()
                .map_err(|_| ConfigError::invalid_value("token address", addr.clone()))?;
            list.register(address, info)?;
        }
        Ok(list)
    }
}
