//! # txrule-chain
//!
//! Per-chain rule evaluation engines for the `txrule` policy core.
//!
//! ## Internal Crate Warning
//!
//! **This crate is an internal implementation detail of `txrule`.**
//!
//! The API is **unstable** and may change without notice between any versions,
//! including patch releases. Depend on `txrule-policy` for programmatic access.
//!
//! ## Core Trait
//!
//! Every chain family implements [`Engine`]: decode raw transaction bytes and
//! check them against one `Allow` rule. Evaluation is pure; engines only hold
//! what they loaded at construction.
//!
//! ## Modules
//!
//! - [`evm`] - EIP-1559 transactions, native transfers, ERC-20 tokens, ABI-backed contracts
//! - [`utxo`] - Bitcoin, Litecoin and Dogecoin, positional output matching
//! - [`solana`] - IDL-driven single-instruction matching
//! - [`cosmos`] - THORChain, MayaChain and Gaia protobuf transactions
//! - [`tron`] - TRX and TRC-20 transfers from `raw_data`
//!
//! ## Engine Registry
//!
//! [`EngineRegistry`] dispatches a rule to the engine named by its resource:
//!
//! ```rust
//! use std::sync::Arc;
//! use txrule_chain::EngineRegistry;
//! use txrule_core::{ErrorKind, Rule, StaticResolver};
//!
//! let registry = EngineRegistry::with_defaults(Arc::new(StaticResolver::new()));
//!
//! let rule = Rule::allow("bitcoin.btc.transfer");
//! let err = registry.evaluate(&rule, &[]).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::MalformedInput);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cosmos;
pub mod engine;
pub mod evm;
pub mod registry;
pub mod solana;
pub mod tron;
pub mod utxo;

pub use engine::{check_size, prepare, Engine};
pub use registry::EngineRegistry;

pub use cosmos::{CosmosChain, CosmosParams};
pub use evm::EvmChain;
pub use solana::SolanaChain;
pub use tron::TronChain;
pub use utxo::{UtxoChain, UtxoNetwork};
