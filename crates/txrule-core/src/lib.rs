//! # txrule-core
//!
//! Core types, comparators and error definitions for the `txrule` transaction
//! policy core.
//!
//! ## Internal Crate Warning
//!
//! **This crate is an internal implementation detail of `txrule`.**
//!
//! The API is **unstable** and may change without notice between any versions,
//! including patch releases. Depend on `txrule-policy` for programmatic access.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy ([`PolicyError`], [`ErrorKind`])
//! - [`types`] - Rule data model ([`Rule`], [`ResourcePath`], [`Target`], [`Constraint`])
//! - [`compare`] - Typed comparators behind Fixed/Min/Max/Magic constraints
//! - [`assert`] - [`assert_arg`], the evaluation primitive every engine uses
//! - [`magic`] - Magic constant resolver interface and a static implementation
//! - [`transaction`] - [`DecodedTransaction`] for account-model chains
//! - [`config`] / [`config_loader`] - TOML configuration
//!
//! ## Example
//!
//! ```rust
//! use txrule_core::{
//!     assert_arg, ArgContext, BigIntCompare, Constraint, Rule, StaticResolver, U256,
//! };
//!
//! let rule = Rule::allow("ethereum.eth.transfer")
//!     .with_constraint("amount", Constraint::max("1000000000000000000"));
//!
//! let resolver = StaticResolver::new();
//! let ctx = ArgContext::new("ethereum", &resolver);
//!
//! let ok = assert_arg(
//!     &ctx,
//!     &rule.parameter_constraints,
//!     "amount",
//!     &U256::from(5u64),
//!     BigIntCompare::boxed,
//! );
//! assert!(ok.is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod assert;
pub mod compare;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod magic;
pub mod transaction;
pub mod types;

pub use assert::{
    assert_arg, assert_str_arg, assert_target, check_constraint, find_constraint,
    reject_unknown_parameters, require_constraint, ArgContext,
};
pub use compare::{
    BigIntCompare, BoolCompare, BytesCompare, Compare, CompareCtor, ExactStringCompare,
    FixedBytesCompare, HexDisplay, IntCompare, StringCompare, UintCompare,
};
pub use error::{ErrorKind, ParseError, PolicyError};
pub use magic::{MagicConstantResolver, ResolvedConstant, StaticResolver, DEFAULT_ENVIRONMENT};
pub use transaction::DecodedTransaction;
pub use types::{
    Constraint, ConstraintKind, Effect, MagicConstant, ParameterConstraint, ResourcePath, Rule,
    Target,
};

// Re-export U256 so downstream crates share one integer type
pub use alloy_primitives::U256;
