//! # txrule-policy
//!
//! Rule dispatch and protocol validators for the `txrule` policy core.
//!
//! ## Internal Crate Warning
//!
//! **This crate is an internal implementation detail of `txrule`.**
//!
//! The API is **unstable** and may change without notice between any versions,
//! including patch releases.
//!
//! ## Modules
//!
//! - [`engine`] - [`PolicyEvaluator`], validation followed by chain evaluation
//! - [`validator`] - [`ProtocolValidator`] and the `RwLock`-guarded [`ValidatorRegistry`]
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use txrule_core::{Constraint, ErrorKind, Rule, StaticResolver, Target};
//! use txrule_policy::PolicyEvaluator;
//!
//! let evaluator = PolicyEvaluator::with_builtin_validators(Arc::new(StaticResolver::new()));
//!
//! // Swap rules must pin the memo; this one is rejected before decoding.
//! let rule = Rule::allow("thorchain.thorchain_swap.swap")
//!     .with_constraint("amount", Constraint::any())
//!     .with_constraint("memo", Constraint::any());
//! let err = evaluator.evaluate(&rule, &[0x0a]).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::RuleShape);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod engine;
pub mod validator;

pub use engine::{PolicyDecision, PolicyEvaluator};
pub use validator::{
    DepositSwapValidator, ProtocolValidator, UtxoOutputsValidator, ValidatorRegistry,
};
