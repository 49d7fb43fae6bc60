//! # CLI Command Handlers
//!
//! - [`check`] - Evaluate one rule against one transaction
//! - [`txid`] - Compute a transaction id
//! - [`exit_codes`] - Process exit codes
//!
//! Each handler takes already-parsed arguments, does its work against a
//! loaded [`Config`], and returns a typed error that knows its exit code.

pub mod check;
pub mod exit_codes;
pub mod txid;

use std::path::Path;

use txrule_core::config::Config;
use txrule_core::config_loader::{load_from_path, ConfigLoader};
use txrule_core::error::ConfigError;

pub use check::{CheckCommand, CheckCommandError};
pub use exit_codes::{EXIT_ERROR, EXIT_POLICY_DENIED, EXIT_SUCCESS};
pub use txid::{TxidCommand, TxidCommandError};

/// Load `path` if given, otherwise the default location.
///
/// An explicit path must exist; the default location falls back to built-in
/// defaults.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed or validated.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => load_from_path(path),
        None => ConfigLoader::new()?.load(),
    }
}

/// Decode hex with an optional `0x` prefix.
pub(crate) fn decode_hex(input: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits)
}
