//! Minimal protobuf reader for TRON `raw_data`.
//!
//! Walks `(field number, wire type, payload)` triples and keeps only the fields
//! the engine needs. Unknown fields are skipped; groups and malformed varints
//! are errors.

use txrule_core::error::ParseError;

/// `Transaction.Contract.ContractType.TransferContract`.
pub const TRANSFER_CONTRACT: u64 = 1;

/// `Transaction.Contract.ContractType.TriggerSmartContract`.
pub const TRIGGER_SMART_CONTRACT: u64 = 31;

/// A decoded field payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    /// Wire type 0.
    Varint(u64),
    /// Wire type 1.
    Fixed64(u64),
    /// Wire type 2.
    Bytes(&'a [u8]),
    /// Wire type 5.
    Fixed32(u32),
}

/// Sequential reader over one protobuf message.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Reader over `buf`.
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| ParseError::invalid_protobuf("field runs past end of message"))?;
        let out = self.buf.get(self.pos..end).unwrap_or_default();
        self.pos = end;
        Ok(out)
    }

    /// Read a base-128 varint of at most ten bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidProtobuf`] on truncation or overflow.
    pub fn read_varint(&mut self) -> Result<u64, ParseError> {
        let mut value: u64 = 0;
        for shift in (0..70).step_by(7) {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or_else(|| ParseError::invalid_protobuf("truncated varint"))?;
            self.pos += 1;
            if shift == 63 && byte > 1 {
                return Err(ParseError::invalid_protobuf("varint overflows u64"));
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(ParseError::invalid_protobuf("varint longer than ten bytes"))
    }

    /// Next field, or `None` at the end of the message.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidProtobuf`] for truncated input, field
    /// number zero, or group wire types.
    pub fn next_field(&mut self) -> Result<Option<(u32, FieldValue<'a>)>, ParseError> {
        if self.pos >= self.buf.len() {
            return Ok(None);
        }
        let key = self.read_varint()?;
        let field = u32::try_from(key >> 3)
            .ok()
            .filter(|f| *f != 0)
            .ok_or_else(|| ParseError::invalid_protobuf(format!("invalid field key {key}")))?;

        let value = match key & 0x7 {
            0 => FieldValue::Varint(self.read_varint()?),
            1 => {
                let bytes = self.take(8)?;
                let mut word = [0u8; 8];
                word.copy_from_slice(bytes);
                FieldValue::Fixed64(u64::from_le_bytes(word))
            }
            2 => {
                let len = usize::try_from(self.read_varint()?)
                    .map_err(|_| ParseError::invalid_protobuf("length overflows usize"))?;
                FieldValue::Bytes(self.take(len)?)
            }
            5 => {
                let bytes = self.take(4)?;
                let mut word = [0u8; 4];
                word.copy_from_slice(bytes);
                FieldValue::Fixed32(u32::from_le_bytes(word))
            }
            other => {
                return Err(ParseError::invalid_protobuf(format!(
                    "unsupported wire type {other} on field {field}"
                )))
            }
        };
        Ok(Some((field, value)))
    }
}

fn expect_bytes<'a>(field: u32, value: FieldValue<'a>) -> Result<&'a [u8], ParseError> {
    match value {
        FieldValue::Bytes(b) => Ok(b),
        _ => Err(ParseError::invalid_protobuf(format!(
            "field {field} should be length-delimited"
        ))),
    }
}

fn expect_varint(field: u32, value: FieldValue<'_>) -> Result<u64, ParseError> {
    match value {
        FieldValue::Varint(v) => Ok(v),
        _ => Err(ParseError::invalid_protobuf(format!(
            "field {field} should be a varint"
        ))),
    }
}

/// `google.protobuf.Any`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnyMessage<'a> {
    /// Type URL, e.g. `type.googleapis.com/protocol.TransferContract`.
    pub type_url: &'a str,
    /// Encoded message.
    pub value: &'a [u8],
}

/// One `Transaction.Contract`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contract<'a> {
    /// Contract type enum value.
    pub contract_type: u64,
    /// Packed contract message.
    pub parameter: Option<AnyMessage<'a>>,
}

/// The fields of `Transaction.raw` the engine reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawData<'a> {
    /// Field 1.
    pub ref_block_bytes: &'a [u8],
    /// Field 4.
    pub ref_block_hash: &'a [u8],
    /// Field 8, milliseconds.
    pub expiration: u64,
    /// Field 10, the memo.
    pub data: &'a [u8],
    /// Field 11.
    pub contracts: Vec<Contract<'a>>,
    /// Field 14, milliseconds.
    pub timestamp: u64,
    /// Field 18, in sun.
    pub fee_limit: u64,
}

/// `protocol.TransferContract`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferContract<'a> {
    /// Field 1.
    pub owner_address: &'a [u8],
    /// Field 2.
    pub to_address: &'a [u8],
    /// Field 3, in sun.
    pub amount: u64,
}

/// `protocol.TriggerSmartContract`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerSmartContract<'a> {
    /// Field 1.
    pub owner_address: &'a [u8],
    /// Field 2.
    pub contract_address: &'a [u8],
    /// Field 3, in sun.
    pub call_value: u64,
    /// Field 4, ABI call data.
    pub data: &'a [u8],
}

/// Decode `raw_data`.
///
/// # Errors
///
/// Returns [`ParseError::InvalidProtobuf`] for malformed input.
pub fn decode_raw_data(buf: &[u8]) -> Result<RawData<'_>, ParseError> {
    let mut raw = RawData::default();
    let mut reader = Reader::new(buf);
    while let Some((field, value)) = reader.next_field()? {
        match field {
            1 => raw.ref_block_bytes = expect_bytes(field, value)?,
            4 => raw.ref_block_hash = expect_bytes(field, value)?,
            8 => raw.expiration = expect_varint(field, value)?,
            10 => raw.data = expect_bytes(field, value)?,
            11 => raw.contracts.push(decode_contract(expect_bytes(field, value)?)?),
            14 => raw.timestamp = expect_varint(field, value)?,
            18 => raw.fee_limit = expect_varint(field, value)?,
            _ => {}
        }
    }
    Ok(raw)
}

fn decode_contract(buf: &[u8]) -> Result<Contract<'_>, ParseError> {
    let mut contract = Contract::default();
    let mut reader = Reader::new(buf);
    while let Some((field, value)) = reader.next_field()? {
        match field {
            1 => contract.contract_type = expect_varint(field, value)?,
            2 => contract.parameter = Some(decode_any(expect_bytes(field, value)?)?),
            _ => {}
        }
    }
    Ok(contract)
}

fn decode_any(buf: &[u8]) -> Result<AnyMessage<'_>, ParseError> {
    let mut any = AnyMessage::default();
    let mut reader = Reader::new(buf);
    while let Some((field, value)) = reader.next_field()? {
        match field {
            1 => {
                any.type_url = std::str::from_utf8(expect_bytes(field, value)?)
                    .map_err(|_| ParseError::invalid_protobuf("type_url is not UTF-8"))?;
            }
            2 => any.value = expect_bytes(field, value)?,
            _ => {}
        }
    }
    Ok(any)
}

/// Decode a `TransferContract`.
///
/// # Errors
///
/// Returns [`ParseError::InvalidProtobuf`] for malformed input.
pub fn decode_transfer(buf: &[u8]) -> Result<TransferContract<'_>, ParseError> {
    let mut msg = TransferContract::default();
    let mut reader = Reader::new(buf);
    while let Some((field, value)) = reader.next_field()? {
        match field {
            1 => msg.owner_address = expect_bytes(field, value)?,
            2 => msg.to_address = expect_bytes(field, value)?,
            3 => msg.amount = expect_varint(field, value)?,
            _ => {}
        }
    }
    Ok(msg)
}

/// Decode a `TriggerSmartContract`.
///
/// # Errors
///
/// Returns [`ParseError::InvalidProtobuf`] for malformed input.
pub fn decode_trigger(buf: &[u8]) -> Result<TriggerSmartContract<'_>, ParseError> {
    let mut msg = TriggerSmartContract::default();
    let mut reader = Reader::new(buf);
    while let Some((field, value)) = reader.next_field()? {
        match field {
            1 => msg.owner_address = expect_bytes(field, value)?,
            2 => msg.contract_address = expect_bytes(field, value)?,
            3 => msg.call_value = expect_varint(field, value)?,
            4 => msg.data = expect_bytes(field, value)?,
            _ => {}
        }
    }
    Ok(msg)
}
