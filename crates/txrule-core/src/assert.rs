//! The single evaluation primitive shared by all chain engines.
//!
//! [`assert_arg`] looks up the constraints bound to a parameter name and
//! checks the extracted value with a typed comparator. Engines decide which
//! parameters are mandatory; a parameter nobody constrained passes here, so
//! engines call [`require_constraint`] for the ones they insist on.

use std::fmt::Display;

use regex::Regex;

use crate::compare::{Compare, CompareCtor};
use crate::error::PolicyError;
use crate::magic::{MagicConstantResolver, DEFAULT_ENVIRONMENT};
use crate::types::{Constraint, ConstraintKind, MagicConstant, ParameterConstraint, Target};

/// Chain and resolver an engine evaluates against.
#[derive(Clone, Copy)]
pub struct ArgContext<'a> {
    chain: &'a str,
    resolver: &'a dyn MagicConstantResolver,
}

impl<'a> ArgContext<'a> {
    /// Bind a chain id to a resolver.
    #[must_use]
    pub fn new(chain: &'a str, resolver: &'a dyn MagicConstantResolver) -> Self {
        Self { chain, resolver }
    }

    /// The chain id constants are resolved for.
    #[must_use]
    pub const fn chain(&self) -> &'a str {
        self.chain
    }

    /// Resolve `constant` for this chain in the default environment.
    ///
    /// # Errors
    ///
    /// Propagates the resolver's failure.
    pub fn resolve(&self, constant: MagicConstant) -> Result<String, PolicyError> {
        self.resolver
            .resolve(constant, self.chain, DEFAULT_ENVIRONMENT)
            .map(|resolved| resolved.value)
    }
}

impl std::fmt::Debug for ArgContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgContext")
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

/// First constraint bound to `name`, if any.
#[must_use]
pub fn find_constraint<'a>(
    constraints: &'a [ParameterConstraint],
    name: &str,
) -> Option<&'a Constraint> {
    constraints
        .iter()
        .find(|pc| pc.parameter_name == name)
        .map(|pc| &pc.constraint)
}

/// Like [`find_constraint`], but a missing constraint is an error.
///
/// # Errors
///
/// Returns [`PolicyError::RuleShape`] if the rule does not constrain `name`.
pub fn require_constraint<'a>(
    constraints: &'a [ParameterConstraint],
    name: &str,
) -> Result<&'a Constraint, PolicyError> {
    find_constraint(constraints, name).ok_or_else(|| {
        PolicyError::rule_shape(format!("rule does not constrain required parameter {name}"))
    })
}

/// Reject constraints on parameters the engine does not extract.
///
/// A misspelled parameter name would otherwise never be checked.
///
/// # Errors
///
/// Returns [`PolicyError::RuleShape`] naming the first unknown parameter.
pub fn reject_unknown_parameters<S: AsRef<str>>(
    constraints: &[ParameterConstraint],
    known: &[S],
) -> Result<(), PolicyError> {
    match constraints
        .iter()
        .find(|pc| !known.iter().any(|k| k.as_ref() == pc.parameter_name))
    {
        Some(pc) => Err(PolicyError::rule_shape(format!(
            "unknown parameter {}",
            pc.parameter_name
        ))),
        None => Ok(()),
    }
}

/// Check every constraint bound to `name` against `actual`.
///
/// # Errors
///
/// Returns [`PolicyError::ConstraintViolation`] on the first failing check or
/// unparseable literal, and propagates magic constant resolution failures.
pub fn assert_arg<T>(
    ctx: &ArgContext<'_>,
    constraints: &[ParameterConstraint],
    name: &str,
    actual: &T,
    ctor: CompareCtor<T>,
) -> Result<(), PolicyError>
where
    T: Display + ?Sized,
{
    for pc in constraints.iter().filter(|pc| pc.parameter_name == name) {
        check_constraint(ctx, name, &pc.constraint.kind, actual, ctor)?;
    }
    Ok(())
}

/// [`assert_arg`] for string parameters, adding `Regexp` support.
///
/// # Errors
///
/// As [`assert_arg`]; an invalid pattern is a constraint violation.
pub fn assert_str_arg(
    ctx: &ArgContext<'_>,
    constraints: &[ParameterConstraint],
    name: &str,
    actual: &str,
    ctor: CompareCtor<str>,
) -> Result<(), PolicyError> {
    for pc in constraints.iter().filter(|pc| pc.parameter_name == name) {
        if let ConstraintKind::Regexp(pattern) = &pc.constraint.kind {
            let re = Regex::new(pattern).map_err(|e| {
                PolicyError::constraint(name, format!("regexp {pattern} (invalid: {e})"), actual)
            })?;
            if !re.is_match(actual) {
                return Err(PolicyError::constraint(
                    name,
                    pc.constraint.kind.to_string(),
                    actual,
                ));
            }
        } else {
            check_constraint(ctx, name, &pc.constraint.kind, actual, ctor)?;
        }
    }
    Ok(())
}

/// Check one constraint kind against `actual`.
///
/// # Errors
///
/// See [`assert_arg`]. `Regexp` is rejected because `T` is not a string.
pub fn check_constraint<T>(
    ctx: &ArgContext<'_>,
    name: &str,
    kind: &ConstraintKind,
    actual: &T,
    ctor: CompareCtor<T>,
) -> Result<(), PolicyError>
where
    T: Display + ?Sized,
{
    let violation = |expected: String| PolicyError::constraint(name, expected, actual.to_string());
    let build = |literal: &str| -> Result<Box<dyn Compare<T>>, PolicyError> {
        ctor(literal).map_err(|e| violation(format!("{kind} (unparseable literal: {e})")))
    };

    let ok = match kind {
        ConstraintKind::Any => true,
        ConstraintKind::Fixed(v) => build(v)?.fixed(actual),
        ConstraintKind::Min(v) => build(v)?.min(actual),
        ConstraintKind::Max(v) => build(v)?.max(actual),
        ConstraintKind::MagicConstant(constant) => {
            let resolved = ctx.resolve(*constant)?;
            if build(&resolved)?.magic(actual) {
                true
            } else {
                return Err(violation(format!("{kind} ({resolved})")));
            }
        }
        ConstraintKind::Regexp(_) => {
            return Err(violation(format!(
                "{kind} (regexp is only supported on string parameters)"
            )));
        }
    };

    if ok {
        Ok(())
    } else {
        Err(violation(kind.to_string()))
    }
}

/// Check a rule's [`Target`] against the transaction's destination.
///
/// # Errors
///
/// Returns [`PolicyError::TargetMismatch`] when the destination differs,
/// [`PolicyError::RuleShape`] when the target literal cannot be parsed, and
/// propagates magic constant resolution failures.
pub fn assert_target<T>(
    ctx: &ArgContext<'_>,
    target: &Target,
    actual: &T,
    ctor: CompareCtor<T>,
) -> Result<(), PolicyError>
where
    T: Display + ?Sized,
{
    match target {
        Target::Unspecified => Ok(()),
        Target::Address(address) => {
            let cmp = ctor(address).map_err(|e| {
                PolicyError::rule_shape(format!("invalid target address {address}: {e}"))
            })?;
            if cmp.fixed(actual) {
                Ok(())
            } else {
                Err(PolicyError::target_mismatch(address, actual.to_string()))
            }
        }
        Target::MagicConstant(constant) => {
            let resolved = ctx.resolve(*constant)?;
            let cmp = ctor(&resolved).map_err(|e| {
                PolicyError::rule_shape(format!("{constant} resolved to invalid address: {e}"))
            })?;
            if cmp.magic(actual) {
                Ok(())
            } else {
                Err(PolicyError::target_mismatch(
                    format!("{constant} ({resolved})"),
                    actual.to_string(),
                ))
            }
        }
    }
}
