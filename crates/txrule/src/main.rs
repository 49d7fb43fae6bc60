//! # `txrule`
//!
//! ## Usage
//!
//! ```bash
//! # Evaluate a rule; exit 0 allowed, 1 denied, 2 error
//! txrule check --rule rule.json --chain-tx 0x02f8...
//!
//! # Same, with a JSON decision and debug logs
//! txrule -vv check --rule rule.json --chain-tx 0x02f8... --format json
//!
//! # Transaction ids
//! txrule txid --chain ethereum 0x02f8... --signature 0x<r||s||v>
//! txrule txid --chain tron 0a02...
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use clap::Parser;
use txrule::cli::commands::{CheckCommand, TxidCommand, EXIT_ERROR, EXIT_SUCCESS};
use txrule::cli::{Cli, Commands};
use txrule::logging::{init_logging, verbosity_to_level, LogConfig};

fn main() {
    let cli = Cli::parse();

    let config = LogConfig {
        level: verbosity_to_level(cli.verbose),
        format: cli.log_format.into(),
    };
    if let Err(e) = init_logging(&config) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(EXIT_ERROR);
    }

    let config_path = cli.config.as_deref();
    let code = match cli.command {
        Commands::Check {
            rule,
            chain_tx,
            format,
        } => match CheckCommand::new(rule, chain_tx, format).run(config_path) {
            Ok(()) => EXIT_SUCCESS,
            Err(e) => {
                eprintln!("{e}");
                e.exit_code()
            }
        },
        Commands::Txid {
            chain,
            transaction,
            signatures,
        } => match TxidCommand::new(chain, transaction, signatures).run(config_path) {
            Ok(()) => EXIT_SUCCESS,
            Err(e) => {
                eprintln!("Error: {e}");
                e.exit_code()
            }
        },
    };

    std::process::exit(code);
}
