//! # Txid Command
//!
//! `txrule txid --chain <ID> <HEX>` prints the `0x`-prefixed transaction id.
//!
//! | Chain | Input | Signatures |
//! |-------|-------|------------|
//! | any configured EVM chain | unsigned EIP-1559 payload | exactly one, 65 bytes |
//! | `tron` | `raw_data` protobuf | ignored |

use std::path::Path;

use alloy_primitives::B256;
use txrule_chain::{evm, tron};
use txrule_core::config::Config;
use txrule_core::error::ConfigError;
use txrule_core::PolicyError;

use super::exit_codes::EXIT_ERROR;
use super::{decode_hex, load_config};

/// Errors from the `txid` command.
#[derive(Debug, thiserror::Error)]
pub enum TxidCommandError {
    /// The chain has no transaction id scheme here.
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),

    /// An argument is not hex.
    #[error("Invalid hex in {field}: {reason}")]
    InvalidHex {
        /// Which argument.
        field: &'static str,
        /// Decoder message.
        reason: String,
    },

    /// The transaction or signature was rejected.
    #[error("Cannot compute transaction id: {0}")]
    Rejected(#[from] PolicyError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl TxidCommandError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        EXIT_ERROR
    }
}

/// The `txrule txid` command handler.
#[derive(Debug, Clone)]
pub struct TxidCommand {
    /// Chain id from resource strings.
    pub chain: String,
    /// Hex-encoded transaction.
    pub transaction: String,
    /// Hex-encoded signatures.
    pub signatures: Vec<String>,
}

impl TxidCommand {
    /// Create a new `TxidCommand`.
    #[must_use]
    pub fn new(
        chain: impl Into<String>,
        transaction: impl Into<String>,
        signatures: Vec<String>,
    ) -> Self {
        Self {
            chain: chain.into(),
            transaction: transaction.into(),
            signatures,
        }
    }

    /// Load configuration and print the transaction id.
    ///
    /// # Errors
    ///
    /// See [`TxidCommand::compute`].
    pub fn run(&self, config_path: Option<&Path>) -> Result<(), TxidCommandError> {
        let config = load_config(config_path)?;
        let hash = self.compute(&config)?;
        println!("{hash}");
        Ok(())
    }

    /// Compute the transaction id.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown chain, bad hex, or a transaction the
    /// chain's hashing rejects.
    pub fn compute(&self, config: &Config) -> Result<B256, TxidCommandError> {
        let tx = decode_hex(&self.transaction).map_err(|e| TxidCommandError::InvalidHex {
            field: "transaction",
            reason: e.to_string(),
        })?;
        let signatures = self
            .signatures
            .iter()
            .map(|s| {
                decode_hex(s).map_err(|e| TxidCommandError::InvalidHex {
                    field: "signature",
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let chain = self.chain.to_ascii_lowercase();
        if chain == tron::TRON_CHAIN_ID {
            return Ok(tron::compute_tx_hash(&tx, signatures.as_slice()));
        }

        let evm_chain = config
            .evm_chain(&chain)
            .ok_or_else(|| TxidCommandError::UnsupportedChain(self.chain.clone()))?;
        let parsed = signatures
            .iter()
            .map(|s| evm::TxSignature::from_bytes(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(evm::compute_tx_hash(&tx, evm_chain.chain_id, &parsed)?)
    }
}
