//! # CLI Module
//!
//! Command-line interface for `txrule`.
//!
//! - [`args`] - clap definitions
//! - [`commands`] - Command handlers and exit codes
//!
//! ```no_run
//! use clap::Parser;
//! use txrule::cli::{Cli, Commands};
//!
//! let cli = Cli::parse();
//! if let Commands::Check { rule, .. } = &cli.command {
//!     println!("checking against {}", rule.display());
//! }
//! ```

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, LogFormatArg, OutputFormat};
