//! # CLI Argument Definitions
//!
//! - `txrule check --rule <FILE> --chain-tx <HEX>` - Evaluate one rule against one transaction
//! - `txrule txid --chain <ID> <HEX> [--signature <HEX>]...` - Print a transaction id
//!
//! ## Global Options
//!
//! - `-v, --verbose` - Increase verbosity level
//! - `-c, --config <PATH>` - Path to configuration file
//! - `--log-format <FORMAT>` - `compact`, `pretty` or `json`

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::logging::LogFormat;

/// Declarative transaction rule evaluation.
#[derive(Debug, Parser)]
#[command(name = "txrule")]
#[command(author, version, about = "Evaluate transactions against declarative rules")]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    ///
    /// Defaults to `~/.txrule/config.toml`; built-in defaults apply when that
    /// file does not exist.
    #[arg(short, long, global = true, value_name = "PATH", env = "TXRULE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Compact)]
    pub log_format: LogFormatArg,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Evaluate a rule against a transaction
    ///
    /// Exits 0 when the transaction is allowed, 1 when it is denied and 2 on
    /// any other error.
    Check {
        /// JSON rule file
        #[arg(long, value_name = "FILE")]
        rule: PathBuf,

        /// Hex-encoded transaction bytes (`0x` prefix optional)
        #[arg(long = "chain-tx", value_name = "HEX")]
        chain_tx: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the transaction id
    ///
    /// EVM chains hash the signed envelope and need exactly one signature;
    /// TRON hashes `raw_data` and ignores signatures.
    Txid {
        /// Chain id, e.g. `ethereum` or `tron`
        #[arg(long, value_name = "ID")]
        chain: String,

        /// Hex-encoded unsigned transaction bytes
        #[arg(value_name = "HEX")]
        transaction: String,

        /// Hex-encoded 65-byte `r || s || v` signature
        #[arg(short, long = "signature", value_name = "HEX")]
        signatures: Vec<String>,
    },
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One human-readable line
    #[default]
    Text,

    /// JSON object with the decision and reason
    Json,
}

/// Log format selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    /// Single-line events
    #[default]
    Compact,
    /// Multi-line events
    Pretty,
    /// JSON events
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Compact => Self::Compact,
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Json => Self::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from([
            "txrule",
            "-vv",
            "check",
            "--rule",
            "rule.json",
            "--chain-tx",
            "0xdead",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Check {
                rule,
                chain_tx,
                format,
            } => {
                assert_eq!(rule, PathBuf::from("rule.json"));
                assert_eq!(chain_tx, "0xdead");
                assert_eq!(format, OutputFormat::Json);
            }
            Commands::Txid { .. } => panic!("expected check"),
        }
    }

    #[test]
    fn test_parse_txid_with_signatures() {
        let cli = Cli::try_parse_from([
            "txrule", "txid", "--chain", "ethereum", "02ab", "-s", "00", "--signature", "11",
        ])
        .unwrap();
        match cli.command {
            Commands::Txid {
                chain,
                transaction,
                signatures,
            } => {
                assert_eq!(chain, "ethereum");
                assert_eq!(transaction, "02ab");
                assert_eq!(signatures, vec!["00".to_string(), "11".to_string()]);
            }
            Commands::Check { .. } => panic!("expected txid"),
        }
    }

    #[test]
    fn test_check_requires_rule() {
        assert!(Cli::try_parse_from(["txrule", "check", "--chain-tx", "00"]).is_err());
    }

    #[test]
    fn test_log_format_conversion() {
        assert_eq!(LogFormat::from(LogFormatArg::Json), LogFormat::Json);
        assert_eq!(LogFormat::from(LogFormatArg::default()), LogFormat::Compact);
    }
}
