//! Contract protocols backed by a JSON ABI.
//!
//! The rule's function id names an ABI function (case-insensitive). Call data
//! is decoded against that function's inputs and every leaf input is checked
//! by name. Tuple components are flattened to `parent.child`; an input with no
//! name is addressed as `param_<index>`.
//!
//! Native value sent along with the call is exposed as `native_value`. It is
//! optional: a rule that leaves it unconstrained only matches calls that send
//! no native value.

use std::fmt;

use alloy_dyn_abi::{DynSolValue, JsonAbiExt};
use alloy_json_abi::{Function, JsonAbi, Param};
use alloy_primitives::{Address, Bytes, B256, I256, U256};
use txrule_core::{
    assert_arg, assert_str_arg, assert_target, find_constraint, reject_unknown_parameters,
    require_constraint, ArgContext, BigIntCompare, BoolCompare, BytesCompare, FixedBytesCompare,
    IntCompare, ParameterConstraint, PolicyError, StringCompare,
};

use super::protocol::{ensure_no_value, EvmAddressCompare, EvmProtocol, PolicyMatcher};
use super::transaction::EvmTransaction;

/// Parameter name bound to the transaction's native value.
pub const NATIVE_VALUE_PARAMETER: &str = "native_value";

/// One decoded leaf input.
#[derive(Debug, Clone, PartialEq)]
pub struct AbiArgument {
    /// Flattened parameter name.
    pub name: String,
    /// Decoded value.
    pub value: DynSolValue,
}

/// A contract protocol described by a JSON ABI.
#[derive(Clone)]
pub struct AbiProtocol {
    name: String,
    abi: JsonAbi,
}

impl fmt::Debug for AbiProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbiProtocol")
            .field("name", &self.name)
            .field("functions", &self.abi.functions().count())
            .finish()
    }
}

impl AbiProtocol {
    /// Wrap a parsed ABI under `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, abi: JsonAbi) -> Self {
        Self {
            name: name.into(),
            abi,
        }
    }

    /// Parse a JSON ABI document.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::RuleShape`] if the JSON is not a valid ABI.
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self, PolicyError> {
        let name = name.into();
        let abi: JsonAbi = serde_json::from_str(json)
            .map_err(|e| PolicyError::rule_shape(format!("ABI {name}: {e}")))?;
        Ok(Self { name, abi })
    }

    /// All functions whose name matches `function_id`, ignoring case.
    fn functions_named<'a>(&'a self, function_id: &'a str) -> impl Iterator<Item = &'a Function> {
        self.abi
            .functions()
            .filter(move |f| f.name.eq_ignore_ascii_case(function_id))
    }

    /// Decode `data` against the function named `function_id`.
    ///
    /// Returns `Ok(None)` when the selector belongs to no overload of that
    /// name.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::UnsupportedProtocol`] when the ABI has no such
    /// function or an input uses an array type, and
    /// [`PolicyError::MalformedInput`] when the call data does not decode.
    pub fn decode_call<'a>(
        &'a self,
        function_id: &'a str,
        data: &[u8],
    ) -> Result<Option<(&'a Function, Vec<AbiArgument>)>, PolicyError> {
        let mut candidates = self.functions_named(function_id).peekable();
        if candidates.peek().is_none() {
            return Err(PolicyError::unsupported(format!(
                "ABI {} has no function {function_id}",
                self.name
            )));
        }

        let Some(selector) = data.get(..4) else {
            return Ok(None);
        };
        let Some(function) = candidates.find(|f| f.selector().as_slice() == selector) else {
            return Ok(None);
        };

        let payload = data.get(4..).unwrap_or_default();
        let values = function.abi_decode_input(payload).map_err(|e| {
            PolicyError::malformed(format!("{} call data: {e}", function.signature()))
        })?;

        let mut args = Vec::new();
        for (index, (param, value)) in function.inputs.iter().zip(values).enumerate() {
            let name = if param.name.is_empty() {
                format!("param_{index}")
            } else {
                param.name.clone()
            };
            flatten(&name, param, value, &mut args)?;
        }
        Ok(Some((function, args)))
    }
}

fn flatten(
    name: &str,
    param: &Param,
    value: DynSolValue,
    out: &mut Vec<AbiArgument>,
) -> Result<(), PolicyError> {
    match value {
        DynSolValue::Tuple(fields) => {
            for (index, (component, field)) in param.components.iter().zip(fields).enumerate() {
                let child = if component.name.is_empty() {
                    format!("{name}.param_{index}")
                } else {
                    format!("{name}.{}", component.name)
                };
                flatten(&child, component, field, out)?;
            }
            Ok(())
        }
        DynSolValue::Array(_) | DynSolValue::FixedArray(_) => Err(PolicyError::unsupported(
            format!("array parameter {name} ({}) is not supported", param.ty),
        )),
        DynSolValue::Function(_) => Err(PolicyError::unsupported(format!(
            "function-typed parameter {name} is not supported"
        ))),
        leaf => {
            out.push(AbiArgument {
                name: name.to_string(),
                value: leaf,
            });
            Ok(())
        }
    }
}

fn assert_abi_arg(
    ctx: &ArgContext<'_>,
    constraints: &[ParameterConstraint],
    arg: &AbiArgument,
) -> Result<(), PolicyError> {
    let name = arg.name.as_str();
    match &arg.value {
        DynSolValue::Address(addr) => {
            assert_arg::<Address>(ctx, constraints, name, addr, EvmAddressCompare::boxed)
        }
        DynSolValue::Uint(v, _) => {
            assert_arg::<U256>(ctx, constraints, name, v, BigIntCompare::boxed)
        }
        DynSolValue::Int(v, _) => assert_arg::<I256>(ctx, constraints, name, v, IntCompare::boxed),
        DynSolValue::Bool(v) => assert_arg::<bool>(ctx, constraints, name, v, BoolCompare::boxed),
        DynSolValue::Bytes(v) => {
            let bytes = Bytes::copy_from_slice(v);
            assert_arg(ctx, constraints, name, &bytes, BytesCompare::boxed)
        }
        DynSolValue::FixedBytes(word, 32) => {
            assert_arg::<B256>(ctx, constraints, name, word, FixedBytesCompare::<32>::boxed)
        }
        DynSolValue::FixedBytes(word, size) => {
            let bytes = Bytes::copy_from_slice(word.get(..*size).unwrap_or_default());
            assert_arg(ctx, constraints, name, &bytes, BytesCompare::boxed)
        }
        DynSolValue::String(s) => assert_str_arg(ctx, constraints, name, s, StringCompare::boxed),
        other => Err(PolicyError::unsupported(format!(
            "parameter {name} has unsupported type {:?}",
            other.as_type()
        ))),
    }
}

impl EvmProtocol for AbiProtocol {
    fn id(&self) -> &str {
        &self.name
    }

    fn match_function_call(
        &self,
        ctx: &ArgContext<'_>,
        matcher: &PolicyMatcher<'_>,
        tx: &EvmTransaction,
    ) -> Result<bool, PolicyError> {
        let resource = matcher.resource()?;
        if matcher.target.is_unspecified() {
            return Err(PolicyError::rule_shape(format!(
                "contract protocol {} requires a target",
                self.name
            )));
        }

        let Some(to) = tx.to else {
            return Ok(false);
        };
        let Some((function, args)) = self.decode_call(&resource.function_id, &tx.data)? else {
            return Ok(false);
        };

        let mut names: Vec<&str> = args.iter().map(|a| a.name.as_str()).collect();
        for name in &names {
            require_constraint(matcher.constraints, name)?;
        }
        // An input literally named `native_value` shadows the native value.
        let value_is_input = names.contains(&NATIVE_VALUE_PARAMETER);
        if !value_is_input {
            names.push(NATIVE_VALUE_PARAMETER);
        }
        reject_unknown_parameters(matcher.constraints, &names)?;

        assert_target(ctx, matcher.target, &to, EvmAddressCompare::boxed)?;

        let value_constrained = !value_is_input
            && find_constraint(matcher.constraints, NATIVE_VALUE_PARAMETER).is_some();
        if value_constrained {
            assert_arg(
                ctx,
                matcher.constraints,
                NATIVE_VALUE_PARAMETER,
                &tx.value,
                BigIntCompare::boxed,
            )?;
        } else {
            ensure_no_value(tx.value, "contract call")?;
        }

        tracing::debug!(
            protocol = %self.name,
            function = %function.signature(),
            arguments = args.len(),
            "checking contract call"
        );
        for arg in &args {
            assert_abi_arg(ctx, matcher.constraints, arg)?;
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::evm::transaction::decode_unsigned;
    use crate::evm::transaction::tests::encode_unsigned;
    use base64::Engine;
    use txrule_core::{Constraint, ErrorKind, MagicConstant, ResourcePath, StaticResolver, Target};

    fn encode_b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    const ROUTER_ABI: &str = r#"[
        {
            "type": "function",
            "name": "swap",
            "stateMutability": "payable",
            "inputs": [
                { "name": "executor", "type": "address" },
                {
                    "name": "desc",
                    "type": "tuple",
                    "components": [
                        { "name": "srcToken", "type": "address" },
                        { "name": "amount", "type": "uint256" },
                        { "name": "flags", "type": "bool" }
                    ]
                },
                { "name": "", "type": "bytes32" }
            ],
            "outputs": []
        },
        {
            "type": "function",
            "name": "batch",
            "stateMutability": "nonpayable",
            "inputs": [ { "name": "targets", "type": "address[]" } ],
            "outputs": []
        },
        {
            "type": "function",
            "name": "deposit",
            "stateMutability": "payable",
            "inputs": [
                { "name": "vault", "type": "address" },
                { "name": "memo", "type": "string" },
                { "name": "delta", "type": "int64" }
            ],
            "outputs": []
        }
    ]"#;

    const ROUTER: &str = "0x1111111254EEB25477B68fb85Ed929f73A960582";

    fn protocol() -> AbiProtocol {
        AbiProtocol::from_json("oneinch", ROUTER_ABI).unwrap()
    }

    fn function(name: &str) -> Function {
        protocol()
            .abi
            .functions()
            .find(|f| f.name == name)
            .cloned()
            .unwrap()
    }

    fn swap_calldata(amount: u64, tag: B256) -> Vec<u8> {
        let values = [
            DynSolValue::Address(Address::repeat_byte(0xee)),
            DynSolValue::Tuple(vec![
                DynSolValue::Address(Address::repeat_byte(0x11)),
                DynSolValue::Uint(U256::from(amount), 256),
                DynSolValue::Bool(true),
            ]),
            DynSolValue::FixedBytes(tag, 32),
        ];
        function("swap").abi_encode_input(&values).unwrap()
    }

    fn swap_constraints(max_amount: &str, tag: B256) -> Vec<ParameterConstraint> {
        vec![
            ParameterConstraint::new("executor", Constraint::any()),
            ParameterConstraint::new(
                "desc.srcToken",
                Constraint::fixed(Address::repeat_byte(0x11).to_string()),
            ),
            ParameterConstraint::new("desc.amount", Constraint::max(max_amount)),
            ParameterConstraint::new("desc.flags", Constraint::fixed("true")),
            ParameterConstraint::new("param_2", Constraint::fixed(encode_b64(tag.as_slice()))),
        ]
    }

    fn run(
        function: &str,
        target: &Target,
        constraints: &[ParameterConstraint],
        data: Vec<u8>,
    ) -> Result<bool, PolicyError> {
        run_with_value(function, target, constraints, data, U256::ZERO)
    }

    fn run_with_value(
        function: &str,
        target: &Target,
        constraints: &[ParameterConstraint],
        data: Vec<u8>,
        value: U256,
    ) -> Result<bool, PolicyError> {
        let resolver = StaticResolver::new().with(MagicConstant::OneinchRouter, "ethereum", ROUTER);
        let ctx = ArgContext::new("ethereum", &resolver);
        let path = ResourcePath::parse(&format!("ethereum.oneinch.{function}")).unwrap();
        let matcher = PolicyMatcher {
            resource: Some(&path),
            target,
            constraints,
        };
        let to: Address = ROUTER.parse().unwrap();
        let tx = decode_unsigned(&encode_unsigned(1, Some(to), value, data)).unwrap();
        protocol().match_function_call(&ctx, &matcher, &tx)
    }

    fn magic_router() -> Target {
        Target::MagicConstant(MagicConstant::OneinchRouter)
    }

    #[test]
    fn test_decode_flattens_tuples() {
        let tag = B256::repeat_byte(7);
        let protocol = protocol();
        let (function, args) = protocol
            .decode_call("SWAP", &swap_calldata(5, tag))
            .unwrap()
            .unwrap();
        assert_eq!(function.name, "swap");
        let names: Vec<_> = args.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(
            names,
            ["executor", "desc.srcToken", "desc.amount", "desc.flags", "param_2"]
        );
    }

    #[test]
    fn test_swap_matches() {
        let tag = B256::repeat_byte(7);
        let cs = swap_constraints("10", tag);
        let result = run("swap", &magic_router(), &cs, swap_calldata(5, tag));
        assert!(result.unwrap());
    }

    #[test]
    fn test_swap_amount_violation_names_flattened_param() {
        let tag = B256::repeat_byte(7);
        let cs = swap_constraints("10", tag);
        let err = run("swap", &magic_router(), &cs, swap_calldata(50, tag)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
        assert!(err.to_string().contains("desc.amount"));
    }

    #[test]
    fn test_swap_bytes32_mismatch() {
        let tag = B256::repeat_byte(7);
        let cs = swap_constraints("10", B256::repeat_byte(8));
        let err = run("swap", &magic_router(), &cs, swap_calldata(5, tag)).unwrap_err();
        assert!(err.to_string().contains("param_2"));
    }

    #[test]
    fn test_every_leaf_must_be_constrained() {
        let tag = B256::repeat_byte(7);
        let mut cs = swap_constraints("10", tag);
        cs.retain(|pc| pc.parameter_name != "desc.flags");
        let err = run("swap", &magic_router(), &cs, swap_calldata(5, tag)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RuleShape);
    }

    #[test]
    fn test_target_required() {
        let tag = B256::repeat_byte(7);
        let cs = swap_constraints("10", tag);
        let err = run("swap", &Target::Unspecified, &cs, swap_calldata(5, tag)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RuleShape);
    }

    #[test]
    fn test_target_mismatch() {
        let tag = B256::repeat_byte(7);
        let target = Target::Address("0x0000000000000000000000000000000000000001".into());
        let cs = swap_constraints("10", tag);
        let err = run("swap", &target, &cs, swap_calldata(5, tag)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TargetMismatch);
    }

    #[test]
    fn test_unconstrained_native_value_is_denied() {
        let tag = B256::repeat_byte(7);
        let value = U256::from(10u64).pow(U256::from(24u64));
        let err = run_with_value(
            "swap",
            &magic_router(),
            &swap_constraints("10", tag),
            swap_calldata(5, tag),
            value,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralViolation);
    }

    #[test]
    fn test_constrained_native_value() {
        let tag = B256::repeat_byte(7);
        let mut cs = swap_constraints("10", tag);
        cs.push(ParameterConstraint::new(
            NATIVE_VALUE_PARAMETER,
            Constraint::max("1000"),
        ));

        let send = |wei: u64| {
            run_with_value("swap", &magic_router(), &cs, swap_calldata(5, tag), U256::from(wei))
        };
        assert!(send(1000).unwrap());

        let err = send(1001).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
        assert!(err.to_string().contains(NATIVE_VALUE_PARAMETER));
    }

    #[test]
    fn test_selector_mismatch_is_non_match() {
        let data = function("deposit")
            .abi_encode_input(&[
                DynSolValue::Address(Address::ZERO),
                DynSolValue::String("x".into()),
                DynSolValue::Int(I256::ZERO, 64),
            ])
            .unwrap();
        let tag = B256::repeat_byte(7);
        assert!(!run("swap", &magic_router(), &swap_constraints("10", tag), data).unwrap());
    }

    #[test]
    fn test_unknown_function() {
        let err = run("withdraw", &magic_router(), &[], vec![0; 4]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedProtocol);
    }

    #[test]
    fn test_arrays_unsupported() {
        let data = function("batch")
            .abi_encode_input(&[DynSolValue::Array(vec![DynSolValue::Address(Address::ZERO)])])
            .unwrap();
        let err = run("batch", &magic_router(), &[], data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedProtocol);
    }

    #[test]
    fn test_string_and_signed_params() {
        let data = function("deposit")
            .abi_encode_input(&[
                DynSolValue::Address(Address::repeat_byte(0x22)),
                DynSolValue::String("SWAP:ETH.ETH:0xabc".into()),
                DynSolValue::Int(I256::try_from(-5i64).unwrap(), 64),
            ])
            .unwrap();
        let cs = vec![
            ParameterConstraint::new("vault", Constraint::any()),
            ParameterConstraint::new("memo", Constraint::regexp("^SWAP:ETH\\.ETH:")),
            ParameterConstraint::new("delta", Constraint::min("-10")),
        ];
        assert!(run("deposit", &magic_router(), &cs, data).unwrap());
    }

    #[test]
    fn test_truncated_call_data_is_malformed() {
        let tag = B256::repeat_byte(7);
        let mut data = swap_calldata(5, tag);
        data.truncate(40);
        let err = run("swap", &magic_router(), &swap_constraints("10", tag), data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }
}
