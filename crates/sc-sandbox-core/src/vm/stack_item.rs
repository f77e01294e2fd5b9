//! Values on the evaluation stack.

use serde::{Serialize, Serializer};
use std::fmt;

use sc_sandbox_types::ContractParameter;

/// Widest integer the VM operates on, in bytes.
pub const MAX_INTEGER_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackItem {
    Boolean(bool),
    Integer(i128),
    ByteArray(Vec<u8>),
    /// Opaque storage context handle returned by `GetContext`.
    InteropContext,
}

impl StackItem {
    pub fn empty() -> Self {
        StackItem::ByteArray(Vec::new())
    }

    /// Canonical byte encoding: little-endian two's complement for integers
    /// (zero is the empty array), `[1]` / `[]` for booleans.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            StackItem::Boolean(true) => vec![1],
            StackItem::Boolean(false) => Vec::new(),
            StackItem::Integer(n) => integer_to_bytes(*n),
            StackItem::ByteArray(bytes) => bytes.clone(),
            StackItem::InteropContext => Vec::new(),
        }
    }

    /// Integer view, `None` if the bytes are wider than [`MAX_INTEGER_SIZE`]
    /// or the item is an interop handle.
    pub fn to_integer(&self) -> Option<i128> {
        match self {
            StackItem::Boolean(b) => Some(*b as i128),
            StackItem::Integer(n) => Some(*n),
            StackItem::ByteArray(bytes) => integer_from_bytes(bytes),
            StackItem::InteropContext => None,
        }
    }

    /// Truthiness: any non-zero byte.
    pub fn to_bool(&self) -> bool {
        match self {
            StackItem::Boolean(b) => *b,
            StackItem::Integer(n) => *n != 0,
            StackItem::ByteArray(bytes) => bytes.iter().any(|b| *b != 0),
            StackItem::InteropContext => true,
        }
    }

    /// Byte-level equality, so `Integer(0)`, `False` and `b''` compare equal.
    pub fn equals(&self, other: &StackItem) -> bool {
        match (self, other) {
            (StackItem::InteropContext, StackItem::InteropContext) => true,
            (StackItem::InteropContext, _) | (_, StackItem::InteropContext) => false,
            _ => self.to_bytes() == other.to_bytes(),
        }
    }

    pub fn byte_len(&self) -> usize {
        match self {
            StackItem::ByteArray(bytes) => bytes.len(),
            other => other.to_bytes().len(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            StackItem::Boolean(_) => "Boolean",
            StackItem::Integer(_) => "Integer",
            StackItem::ByteArray(_) => "ByteArray",
            StackItem::InteropContext => "InteropInterface",
        }
    }
}

impl From<&ContractParameter> for StackItem {
    fn from(param: &ContractParameter) -> Self {
        match param {
            ContractParameter::Boolean(b) => StackItem::Boolean(*b),
            ContractParameter::Integer(n) => StackItem::Integer(*n),
            ContractParameter::ByteArray(bytes) => StackItem::ByteArray(bytes.clone()),
            ContractParameter::String(s) => StackItem::ByteArray(s.as_bytes().to_vec()),
            ContractParameter::Hash160(hash) => StackItem::ByteArray(hash.to_vec()),
        }
    }
}

impl fmt::Display for StackItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackItem::Boolean(b) => write!(f, "{}", b),
            StackItem::Integer(n) => write!(f, "{}", n),
            StackItem::ByteArray(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) if !text.is_empty() && text.chars().all(|c| !c.is_control()) => {
                    write!(f, "b'{}'", text)
                }
                _ => write!(f, "0x{}", hex::encode(bytes)),
            },
            StackItem::InteropContext => write!(f, "<storage context>"),
        }
    }
}

impl Serialize for StackItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("StackItem", 2)?;
        state.serialize_field("type", self.type_name())?;
        match self {
            StackItem::Boolean(b) => state.serialize_field("value", b)?,
            StackItem::Integer(n) => state.serialize_field("value", &n.to_string())?,
            StackItem::ByteArray(bytes) => {
                state.serialize_field("value", &format!("0x{}", hex::encode(bytes)))?
            }
            StackItem::InteropContext => state.serialize_field("value", &())?,
        }
        state.end()
    }
}

/// Minimal little-endian two's complement encoding of `value`.
pub fn integer_to_bytes(value: i128) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let mut bytes = value.to_le_bytes().to_vec();
    while bytes.len() > 1 {
        let last = bytes[bytes.len() - 1];
        let prev_sign = bytes[bytes.len() - 2] & 0x80;
        if (last == 0x00 && prev_sign == 0) || (last == 0xff && prev_sign != 0) {
            bytes.pop();
        } else {
            break;
        }
    }
    bytes
}

/// Decode little-endian two's complement bytes.
pub fn integer_from_bytes(bytes: &[u8]) -> Option<i128> {
    if bytes.is_empty() {
        return Some(0);
    }
    if bytes.len() > MAX_INTEGER_SIZE {
        return None;
    }
    let fill = if bytes[bytes.len() - 1] & 0x80 != 0 {
        0xff
    } else {
        0x00
    };
    let mut buf = [fill; MAX_INTEGER_SIZE];
    buf[..bytes.len()].copy_from_slice(bytes);
    Some(i128::from_le_bytes(buf))
}
