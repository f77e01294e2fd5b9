//! Contract call arguments.
//!
//! Both positional arguments and answers typed at interactive prompts are
//! turned into [`ContractParameter`] values by [`ContractParameter::parse_token`],
//! so the two input paths cannot drift apart.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::address::ScriptHash;

/// A single argument passed to a contract's entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum ContractParameter {
    Boolean(bool),
    Integer(i128),
    ByteArray(#[serde(serialize_with = "serialize_hex")] Vec<u8>),
    String(String),
    Hash160(ScriptHash),
}

fn serialize_hex<T: AsRef<[u8]>, S: Serializer>(
    bytes: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{}", hex::encode(bytes.as_ref())))
}

impl ContractParameter {
    /// Interpret a raw command-line token.
    ///
    /// Rules, first match wins:
    /// - `true` / `false` (any case) → [`ContractParameter::Boolean`]
    /// - decimal integer → [`ContractParameter::Integer`]
    /// - `0x` followed by an even number of hex digits → [`ContractParameter::ByteArray`]
    /// - text wrapped in matching single or double quotes → [`ContractParameter::String`]
    /// - a valid address, when `parse_addresses` is set → [`ContractParameter::Hash160`]
    /// - anything else → [`ContractParameter::String`]
    pub fn parse_token(token: &str, parse_addresses: bool) -> Self {
        let token = token.trim();

        if token.eq_ignore_ascii_case("true") {
            return ContractParameter::Boolean(true);
        }
        if token.eq_ignore_ascii_case("false") {
            return ContractParameter::Boolean(false);
        }

        if let Ok(value) = token.parse::<i128>() {
            return ContractParameter::Integer(value);
        }

        if let Some(hex_part) = token.strip_prefix("0x") {
            if !hex_part.is_empty() && hex_part.len() % 2 == 0 {
                if let Ok(bytes) = hex::decode(hex_part) {
                    return ContractParameter::ByteArray(bytes);
                }
            }
        }

        if let Some(inner) = strip_quotes(token) {
            return ContractParameter::String(inner.to_string());
        }

        if parse_addresses {
            if let Ok(hash) = ScriptHash::from_address(token) {
                return ContractParameter::Hash160(hash);
            }
        }

        ContractParameter::String(token.to_string())
    }

    /// Short type label used in prompts and summaries.
    pub fn type_name(&self) -> &'static str {
        match self {
            ContractParameter::Boolean(_) => "Boolean",
            ContractParameter::Integer(_) => "Integer",
            ContractParameter::ByteArray(_) => "ByteArray",
            ContractParameter::String(_) => "String",
            ContractParameter::Hash160(_) => "Hash160",
        }
    }
}

fn strip_quotes(token: &str) -> Option<&str> {
    if token.len() < 2 {
        return None;
    }
    for quote in ['"', '\''] {
        if token.starts_with(quote) && token.ends_with(quote) {
            return Some(&token[1..token.len() - 1]);
        }
    }
    None
}

impl fmt::Display for ContractParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractParameter::Boolean(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            ContractParameter::Integer(n) => write!(f, "{}", n),
            ContractParameter::ByteArray(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            ContractParameter::String(s) => write!(f, "'{}'", s),
            ContractParameter::Hash160(hash) => write!(f, "{}", hash.to_address()),
        }
    }
}
