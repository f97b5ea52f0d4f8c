// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

//! Runtime values and the shared operand stack.
//!
//! `VmValue` is the tagged union flowing between contract bytecode and host
//! functions. Coercions are fallible and never panic: malformed or mistyped
//! input from untrusted bytecode resolves to a fault.

use core::fmt;

use num_bigint::BigInt;
use num_derive::FromPrimitive;
use num_traits::{FromPrimitive, ToPrimitive};

use crate::abi::ContractInterface;
use crate::error::{VmError, VmResult};
use crate::types::{Address, Hash, Timestamp};

/// Value kind tags, used by literal loads and ABI descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, strum::Display)]
pub enum VmType {
    None = 0,
    Bytes = 1,
    Number = 2,
    String = 3,
    Bool = 4,
    Enum = 5,
    Timestamp = 6,
    Object = 7,
}

/// A runtime value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum VmValue {
    #[default]
    None,
    Bytes(Vec<u8>),
    String(String),
    Number(BigInt),
    Bool(bool),
    Enum(u32),
    Address(Address),
    Hash(Hash),
    Timestamp(Timestamp),
    Abi(ContractInterface),
    /// Handle to a loaded contract execution context.
    Context(String),
}

impl VmValue {
    pub fn kind(&self) -> VmType {
        match self {
            VmValue::None => VmType::None,
            VmValue::Bytes(_) => VmType::Bytes,
            VmValue::String(_) => VmType::String,
            VmValue::Number(_) => VmType::Number,
            VmValue::Bool(_) => VmType::Bool,
            VmValue::Enum(_) => VmType::Enum,
            VmValue::Timestamp(_) => VmType::Timestamp,
            VmValue::Address(_) | VmValue::Hash(_) | VmValue::Abi(_) | VmValue::Context(_) => {
                VmType::Object
            }
        }
    }

    /// Decodes a literal of the given kind, as written by the `LOAD` opcode.
    pub fn from_typed_bytes(vm_type: VmType, bytes: &[u8]) -> VmResult<Self> {
        match vm_type {
            VmType::Bytes => Ok(VmValue::Bytes(bytes.to_vec())),
            VmType::String => String::from_utf8(bytes.to_vec())
                .map(VmValue::String)
                .map_err(|_| VmError::InvalidArgument("string literal is not utf-8".into())),
            VmType::Number => Ok(VmValue::Number(BigInt::from_signed_bytes_le(bytes))),
            VmType::Bool => match bytes {
                [byte] => Ok(VmValue::Bool(*byte != 0)),
                _ => Err(VmError::InvalidArgument("bool literal must be one byte".into())),
            },
            VmType::Enum => decode_u32(bytes).map(VmValue::Enum),
            VmType::Timestamp => decode_u32(bytes).map(|v| VmValue::Timestamp(Timestamp(v))),
            VmType::None | VmType::Object => Err(VmError::InvalidArgument(format!(
                "cannot load literal of type {vm_type}"
            ))),
        }
    }

    pub fn as_string(&self) -> VmResult<String> {
        match self {
            VmValue::String(s) => Ok(s.clone()),
            VmValue::Number(n) => Ok(n.to_string()),
            VmValue::Bool(b) => Ok(b.to_string()),
            other => Err(VmError::InvalidType(format!(
                "cannot convert {} to string",
                other.kind()
            ))),
        }
    }

    pub fn as_bytes(&self) -> VmResult<Vec<u8>> {
        match self {
            VmValue::Bytes(b) => Ok(b.clone()),
            VmValue::String(s) => Ok(s.as_bytes().to_vec()),
            VmValue::Number(n) => Ok(n.to_signed_bytes_le()),
            VmValue::Address(a) => Ok(a.to_bytes().to_vec()),
            VmValue::Hash(h) => Ok(h.to_bytes().to_vec()),
            other => Err(VmError::InvalidType(format!(
                "cannot convert {} to bytes",
                other.kind()
            ))),
        }
    }

    pub fn as_number(&self) -> VmResult<BigInt> {
        match self {
            VmValue::Number(n) => Ok(n.clone()),
            VmValue::Bytes(b) => Ok(BigInt::from_signed_bytes_le(b)),
            VmValue::Bool(b) => Ok(BigInt::from(*b as u8)),
            VmValue::Enum(v) => Ok(BigInt::from(*v)),
            VmValue::Timestamp(t) => Ok(BigInt::from(t.value())),
            VmValue::String(s) => s
                .parse::<BigInt>()
                .map_err(|_| VmError::InvalidType(format!("cannot parse \"{s}\" as number"))),
            other => Err(VmError::InvalidType(format!(
                "cannot convert {} to number",
                other.kind()
            ))),
        }
    }

    pub fn as_bool(&self) -> VmResult<bool> {
        match self {
            VmValue::Bool(b) => Ok(*b),
            VmValue::Number(n) => Ok(!n.eq(&BigInt::from(0))),
            other => Err(VmError::InvalidType(format!(
                "cannot convert {} to bool",
                other.kind()
            ))),
        }
    }

    pub fn as_u32(&self) -> VmResult<u32> {
        match self {
            VmValue::Enum(v) => Ok(*v),
            VmValue::Number(n) => n
                .to_u32()
                .ok_or_else(|| VmError::InvalidArgument("number out of u32 range".into())),
            other => Err(VmError::InvalidType(format!(
                "cannot convert {} to u32",
                other.kind()
            ))),
        }
    }

    pub fn as_address(&self) -> VmResult<Address> {
        match self {
            VmValue::Address(a) => Ok(*a),
            VmValue::Bytes(b) => Address::from_bytes(b),
            other => Err(VmError::InvalidType(format!(
                "cannot convert {} to address",
                other.kind()
            ))),
        }
    }

    pub fn as_hash(&self) -> VmResult<Hash> {
        match self {
            VmValue::Hash(h) => Ok(*h),
            VmValue::Bytes(b) => Hash::from_bytes(b),
            other => Err(VmError::InvalidType(format!(
                "cannot convert {} to hash",
                other.kind()
            ))),
        }
    }
}

impl fmt::Display for VmValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmValue::None => write!(f, "none"),
            VmValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            VmValue::String(s) => write!(f, "{s}"),
            VmValue::Number(n) => write!(f, "{n}"),
            VmValue::Bool(b) => write!(f, "{b}"),
            VmValue::Enum(v) => write!(f, "enum({v})"),
            VmValue::Address(a) => write!(f, "{a}"),
            VmValue::Hash(h) => write!(f, "{h}"),
            VmValue::Timestamp(t) => write!(f, "{t}"),
            VmValue::Abi(_) => write!(f, "abi"),
            VmValue::Context(name) => write!(f, "context({name})"),
        }
    }
}

fn decode_u32(bytes: &[u8]) -> VmResult<u32> {
    let array: [u8; 4] = bytes
        .try_into()
        .map_err(|_| VmError::InvalidArgument("literal must be four bytes".into()))?;
    Ok(u32::from_le_bytes(array))
}

/// Maximum number of values the operand stack may hold.
pub const MAX_STACK_SIZE: usize = 2048;

/// The operand stack shared between contract bytecode and host functions.
#[derive(Debug, Default)]
pub struct Stack {
    items: Vec<VmValue>,
}

impl Stack {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, value: VmValue) -> VmResult<()> {
        if self.items.len() >= MAX_STACK_SIZE {
            return Err(VmError::StackOverflow(format!(
                "operand stack limit is {MAX_STACK_SIZE}"
            )));
        }
        self.items.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> VmResult<VmValue> {
        self.items
            .pop()
            .ok_or_else(|| VmError::StackUnderflow("pop from empty operand stack".into()))
    }

    pub fn peek(&self, depth: usize) -> VmResult<&VmValue> {
        if depth >= self.items.len() {
            return Err(VmError::StackUnderflow(format!(
                "peek {depth} beyond stack depth {}",
                self.items.len()
            )));
        }
        Ok(&self.items[self.items.len() - depth - 1])
    }
}
