//! Script hashes and base58check addresses.
//!
//! A script hash is the 20-byte identifier of a contract or of an account's
//! verification script. Addresses are the human-facing form of a script hash:
//!
//! ```text
//! base58( version || script_hash || checksum )
//! ```
//!
//! where `version` is [`ADDRESS_VERSION`] and `checksum` is the first four bytes
//! of a double SHA-256 over the preceding 21 bytes.
//!
//! # Examples
//!
//! ```
//! use sc_sandbox_types::address::{is_valid_address, ScriptHash};
//!
//! let hash = ScriptHash::from_address("AJQ6FoaSXDFzA6wLnyZ1nFN7SGSN2oNTc3").unwrap();
//! assert_eq!(hash.to_address(), "AJQ6FoaSXDFzA6wLnyZ1nFN7SGSN2oNTc3");
//! assert!(!is_valid_address("not-an-address"));
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Version byte prefixed to every address payload.
pub const ADDRESS_VERSION: u8 = 0x17;

/// Length of a script hash in bytes.
pub const SCRIPT_HASH_LEN: usize = 20;

const CHECKSUM_LEN: usize = 4;
const ADDRESS_PAYLOAD_LEN: usize = 1 + SCRIPT_HASH_LEN + CHECKSUM_LEN;

/// Double SHA-256.
pub fn hash256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// Check whether `address` is a well-formed address (base58, version, checksum).
pub fn is_valid_address(address: &str) -> bool {
    ScriptHash::from_address(address).is_ok()
}

/// Errors produced while decoding an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The string is not valid base58.
    InvalidBase58(String),
    /// Decoded payload has the wrong size.
    InvalidLength(usize),
    /// Version byte does not match [`ADDRESS_VERSION`].
    InvalidVersion(u8),
    /// Checksum bytes do not match the payload.
    ChecksumMismatch,
    /// A hex script hash could not be parsed.
    InvalidHex(String),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::InvalidBase58(msg) => write!(f, "invalid base58 encoding: {}", msg),
            AddressError::InvalidLength(len) => write!(
                f,
                "invalid address length: expected {} bytes, got {}",
                ADDRESS_PAYLOAD_LEN, len
            ),
            AddressError::InvalidVersion(v) => write!(
                f,
                "invalid address version 0x{:02x} (expected 0x{:02x})",
                v, ADDRESS_VERSION
            ),
            AddressError::ChecksumMismatch => write!(f, "address checksum mismatch"),
            AddressError::InvalidHex(s) => write!(f, "invalid script hash hex '{}'", s),
        }
    }
}

impl std::error::Error for AddressError {}

/// 20-byte identifier of a contract or account script.
///
/// Bytes are kept in storage order; [`fmt::Display`] prints them reversed as a
/// `0x`-prefixed big-endian hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ScriptHash([u8; SCRIPT_HASH_LEN]);

impl ScriptHash {
    pub const fn new(bytes: [u8; SCRIPT_HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a script hash from a byte slice of exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; SCRIPT_HASH_LEN] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    /// Hash of an arbitrary script: the first 20 bytes of its double SHA-256.
    pub fn of_script(script: &[u8]) -> Self {
        let digest = hash256(script);
        let mut out = [0u8; SCRIPT_HASH_LEN];
        out.copy_from_slice(&digest[..SCRIPT_HASH_LEN]);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; SCRIPT_HASH_LEN] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Encode as a base58check address.
    pub fn to_address(&self) -> String {
        let mut payload = Vec::with_capacity(ADDRESS_PAYLOAD_LEN);
        payload.push(ADDRESS_VERSION);
        payload.extend_from_slice(&self.0);
        let checksum = hash256(&payload);
        payload.extend_from_slice(&checksum[..CHECKSUM_LEN]);
        bs58::encode(payload).into_string()
    }

    /// Decode a base58check address.
    pub fn from_address(address: &str) -> Result<Self, AddressError> {
        let payload = bs58::decode(address.trim())
            .into_vec()
            .map_err(|e| AddressError::InvalidBase58(e.to_string()))?;

        if payload.len() != ADDRESS_PAYLOAD_LEN {
            return Err(AddressError::InvalidLength(payload.len()));
        }
        if payload[0] != ADDRESS_VERSION {
            return Err(AddressError::InvalidVersion(payload[0]));
        }

        let (body, checksum) = payload.split_at(1 + SCRIPT_HASH_LEN);
        if hash256(body)[..CHECKSUM_LEN] != *checksum {
            return Err(AddressError::ChecksumMismatch);
        }

        let mut out = [0u8; SCRIPT_HASH_LEN];
        out.copy_from_slice(&body[1..]);
        Ok(Self(out))
    }

    /// Parse the big-endian hex form printed by [`fmt::Display`].
    pub fn from_hex(hex_str: &str) -> Result<Self, AddressError> {
        let trimmed = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let mut bytes =
            hex::decode(trimmed).map_err(|_| AddressError::InvalidHex(hex_str.to_string()))?;
        bytes.reverse();
        Self::from_slice(&bytes).ok_or_else(|| AddressError::InvalidHex(hex_str.to_string()))
    }
}

impl fmt::Display for ScriptHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        write!(f, "0x{}", hex::encode(reversed))
    }
}

impl FromStr for ScriptHash {
    type Err = AddressError;

    /// Accepts either an address or a `0x`-prefixed big-endian hex string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("0x") || s.starts_with("0X") {
            Self::from_hex(&s.to_lowercase())
        } else {
            Self::from_address(s)
        }
    }
}

impl Serialize for ScriptHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_address())
    }
}

impl<'de> Deserialize<'de> for ScriptHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET_ADDR: &str = "AJQ6FoaSXDFzA6wLnyZ1nFN7SGSN2oNTc3";
    const OTHER_ADDR: &str = "AG4GfwjnvydAZodm4xEDivguCtjCFzLcJy";

    #[test]
    fn test_decode_known_address() {
        let hash = ScriptHash::from_address(WALLET_ADDR).unwrap();
        assert_eq!(
            hex::encode(hash.as_bytes()),
            "1cc9c05cefffe6cdd7b182816a9152ec218d2ec0"
        );
    }

    #[test]
    fn test_address_roundtrip() {
        for addr in [WALLET_ADDR, OTHER_ADDR, "AGYaEi3W6ndHPUmW7T12FFfsbQ6DWymkEm"] {
            let hash = ScriptHash::from_address(addr).unwrap();
            assert_eq!(hash.to_address(), addr);
        }
    }

    #[test]
    fn test_zero_hash_address() {
        assert_eq!(
            ScriptHash::default().to_address(),
            "AFmseVrdL9f9oyCzZefL9tG6UbvhPbdYzM"
        );
    }

    #[test]
    fn test_checksum_mismatch() {
        let err = ScriptHash::from_address("AG4GfwjnvydAZodm4xEDivguCtjCFzLcJz").unwrap_err();
        assert_eq!(err, AddressError::ChecksumMismatch);
    }

    #[test]
    fn test_wrong_version() {
        let err = ScriptHash::from_address("AfPsf435eA63PEmr6NZYD3xgqPz8w1tcX1").unwrap_err();
        assert_eq!(err, AddressError::InvalidVersion(0x18));
    }

    #[test]
    fn test_invalid_base58() {
        // '0' and 'l' are outside the base58 alphabet
        assert!(matches!(
            ScriptHash::from_address("0l0l"),
            Err(AddressError::InvalidBase58(_))
        ));
        assert!(matches!(
            ScriptHash::from_address("abc"),
            Err(AddressError::InvalidLength(_))
        ));
        assert!(!is_valid_address("SampleSC.py"));
    }

    #[test]
    fn test_display_is_reversed_hex() {
        let hash = ScriptHash::from_address(WALLET_ADDR).unwrap();
        let shown = hash.to_string();
        assert_eq!(shown, "0xc02e8d21ec52916a8182b1d7cde6ffef5cc0c91c");
        assert_eq!(shown.parse::<ScriptHash>().unwrap(), hash);
    }

    #[test]
    fn test_of_script_is_deterministic() {
        let a = ScriptHash::of_script(&[1, 2, 3]);
        let b = ScriptHash::of_script(&[1, 2, 3]);
        let c = ScriptHash::of_script(&[1, 2, 4]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_serde_uses_address_form() {
        let hash = ScriptHash::from_address(OTHER_ADDR).unwrap();
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", OTHER_ADDR));
        let back: ScriptHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
