//! # txrule
//!
//! Evaluate raw blockchain transactions against declarative allow rules.
//!
//! This crate is the command-line front end. Evaluation lives in
//! `txrule-policy` and the per-chain engines in `txrule-chain`; this crate
//! wires them to configuration, logging and process exit codes.
//!
//! ## Modules
//!
//! - [`cli`] - Argument parsing and command handlers
//! - [`logging`] - `tracing-subscriber` setup

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cli;
pub mod logging;

pub use logging::{init_logging, verbosity_to_level, LogConfig, LogError, LogFormat, LogLevel};
