//! Anchor-style IDL subset.
//!
//! Only what instruction matching needs is read: the program address, and per
//! instruction its discriminator, ordered account names and ordered argument
//! types. Both the current (`address`, `discriminator`, `pubkey`) and legacy
//! (`metadata.address`, `isMut`, `publicKey`) layouts deserialize.

use std::fmt;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use txrule_core::error::ParseError;
use txrule_core::PolicyError;

/// Length of an Anchor instruction discriminator.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Borsh argument types the engine can decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdlType {
    /// `u8`.
    U8,
    /// `u16`, little-endian.
    U16,
    /// `u32`, little-endian.
    U32,
    /// `u64`, little-endian.
    U64,
    /// `u128`, little-endian.
    U128,
    /// One byte, 0 or 1.
    Bool,
    /// 32-byte public key.
    Pubkey,
    /// Anything else; decoding it fails.
    Unsupported(String),
}

impl IdlType {
    fn from_json(value: &serde_json::Value) -> Self {
        match value.as_str() {
            Some("u8") => Self::U8,
            Some("u16") => Self::U16,
            Some("u32") => Self::U32,
            Some("u64") => Self::U64,
            Some("u128") => Self::U128,
            Some("bool") => Self::Bool,
            Some("pubkey" | "publicKey") => Self::Pubkey,
            Some(other) => Self::Unsupported(other.to_string()),
            None => Self::Unsupported(value.to_string()),
        }
    }
}

impl fmt::Display for IdlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8 => f.write_str("u8"),
            Self::U16 => f.write_str("u16"),
            Self::U32 => f.write_str("u32"),
            Self::U64 => f.write_str("u64"),
            Self::U128 => f.write_str("u128"),
            Self::Bool => f.write_str("bool"),
            Self::Pubkey => f.write_str("pubkey"),
            Self::Unsupported(name) => f.write_str(name),
        }
    }
}

/// A decoded Borsh argument value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgValue {
    /// Any unsigned integer, widened.
    Uint(u128),
    /// A boolean.
    Bool(bool),
    /// A public key.
    Pubkey(Pubkey),
}

// ----------------------------------------------------------------------------
// JSON layout
// ----------------------------------------------------------------------------

#[derive(Deserialize)]
struct RawIdl {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    metadata: Option<RawMetadata>,
    instructions: Vec<RawInstruction>,
}

#[derive(Deserialize)]
struct RawMetadata {
    #[serde(default)]
    address: Option<String>,
}

#[derive(Deserialize)]
struct RawInstruction {
    name: String,
    #[serde(default)]
    discriminator: Option<Vec<u8>>,
    #[serde(default)]
    accounts: Vec<RawAccount>,
    #[serde(default)]
    args: Vec<RawArg>,
}

#[derive(Deserialize)]
struct RawAccount {
    name: String,
    // Composite account groups nest their members.
    #[serde(default)]
    accounts: Vec<RawAccount>,
}

#[derive(Deserialize)]
struct RawArg {
    name: String,
    #[serde(rename = "type")]
    ty: serde_json::Value,
}

fn flatten_accounts(raw: Vec<RawAccount>, out: &mut Vec<String>) {
    for account in raw {
        if account.accounts.is_empty() {
            out.push(account.name);
        } else {
            flatten_accounts(account.accounts, out);
        }
    }
}

// ----------------------------------------------------------------------------
// Loaded IDL
// ----------------------------------------------------------------------------

/// One instruction schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdlInstruction {
    /// Instruction name as written in the IDL.
    pub name: String,
    /// Prefix of the instruction data.
    pub discriminator: Vec<u8>,
    /// Account names in declaration order.
    pub accounts: Vec<String>,
    /// `(name, type)` in declaration order.
    pub args: Vec<(String, IdlType)>,
}

impl IdlInstruction {
    /// Decode `data` into named argument values.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MalformedCalldata`] when the discriminator does
    /// not match, an argument type is unsupported, data runs short, or bytes
    /// remain after the last argument.
    pub fn decode_args(&self, data: &[u8]) -> Result<Vec<(&str, ArgValue)>, ParseError> {
        let mut rest = data.strip_prefix(self.discriminator.as_slice()).ok_or_else(|| {
            ParseError::malformed_calldata(format!(
                "instruction data does not start with the {} discriminator",
                self.name
            ))
        })?;

        let mut values = Vec::with_capacity(self.args.len());
        for (name, ty) in &self.args {
            let width = match ty {
                IdlType::U8 | IdlType::Bool => 1,
                IdlType::U16 => 2,
                IdlType::U32 => 4,
                IdlType::U64 => 8,
                IdlType::U128 => 16,
                IdlType::Pubkey => 32,
                IdlType::Unsupported(t) => {
                    return Err(ParseError::malformed_calldata(format!(
                        "argument {name} has unsupported type {t}"
                    )));
                }
            };
            let (bytes, tail) = rest.split_at_checked(width).ok_or_else(|| {
                ParseError::malformed_calldata(format!("instruction data ends inside {name}"))
            })?;
            rest = tail;

            let value = match ty {
                IdlType::Bool => match bytes {
                    [0] => ArgValue::Bool(false),
                    [1] => ArgValue::Bool(true),
                    _ => {
                        return Err(ParseError::malformed_calldata(format!(
                            "argument {name} is not a bool"
                        )));
                    }
                },
                IdlType::Pubkey => {
                    let key: [u8; 32] = bytes
                        .try_into()
                        .map_err(|_| ParseError::malformed_calldata(name.clone()))?;
                    ArgValue::Pubkey(Pubkey::new_from_array(key))
                }
                _ => {
                    let mut buf = [0u8; 16];
                    buf[..width].copy_from_slice(bytes);
                    ArgValue::Uint(u128::from_le_bytes(buf))
                }
            };
            values.push((name.as_str(), value));
        }

        if !rest.is_empty() {
            return Err(ParseError::malformed_calldata(format!(
                "{} trailing bytes after {} arguments",
                rest.len(),
                self.name
            )));
        }
        Ok(values)
    }
}

/// Anchor sighash: `sha256("global:<name>")[..8]`.
#[must_use]
pub fn sighash(snake_name: &str) -> Vec<u8> {
    let digest = Sha256::digest(format!("global:{snake_name}").as_bytes());
    digest[..DISCRIMINATOR_LEN].to_vec()
}

/// `camelCase` to `snake_case`, as Anchor does when hashing legacy names.
fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// A loaded program IDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Idl {
    name: String,
    address: Option<Pubkey>,
    instructions: Vec<IdlInstruction>,
}

impl Idl {
    /// Assemble an IDL from parts.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        address: Option<Pubkey>,
        instructions: Vec<IdlInstruction>,
    ) -> Self {
        Self {
            name: name.into(),
            address,
            instructions,
        }
    }

    /// Parse an IDL from JSON and register it under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::RuleShape`] for invalid JSON, an invalid program
    /// address, or a discriminator that is empty.
    pub fn from_json(name: &str, json: &str) -> Result<Self, PolicyError> {
        let raw: RawIdl = serde_json::from_str(json)
            .map_err(|e| PolicyError::rule_shape(format!("invalid IDL {name}: {e}")))?;

        let address = raw
            .address
            .or_else(|| raw.metadata.and_then(|m| m.address))
            .map(|a| {
                a.parse::<Pubkey>().map_err(|e| {
                    PolicyError::rule_shape(format!("IDL {name} has invalid address {a}: {e}"))
                })
            })
            .transpose()?;

        let mut instructions = Vec::with_capacity(raw.instructions.len());
        for ix in raw.instructions {
            let discriminator = match ix.discriminator {
                Some(d) if d.is_empty() => {
                    return Err(PolicyError::rule_shape(format!(
                        "IDL {name} instruction {} has an empty discriminator",
                        ix.name
                    )));
                }
                Some(d) => d,
                None => sighash(&snake_case(&ix.name)),
            };
            let mut accounts = Vec::new();
            flatten_accounts(ix.accounts, &mut accounts);
            let args = ix
                .args
                .into_iter()
                .map(|a| (a.name, IdlType::from_json(&a.ty)))
                .collect();
            instructions.push(IdlInstruction {
                name: ix.name,
                discriminator,
                accounts,
                args,
            });
        }

        Ok(Self::new(name, address, instructions))
    }

    /// Protocol id this IDL answers to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Program address declared by the IDL, if any.
    #[must_use]
    pub const fn address(&self) -> Option<&Pubkey> {
        self.address.as_ref()
    }

    /// Look up an instruction by name. Matches the IDL name exactly, or its
    /// snake-case form case-insensitively.
    #[must_use]
    pub fn instruction(&self, function_id: &str) -> Option<&IdlInstruction> {
        self.instructions.iter().find(|ix| {
            ix.name == function_id || snake_case(&ix.name).eq_ignore_ascii_case(function_id)
        })
    }
}
