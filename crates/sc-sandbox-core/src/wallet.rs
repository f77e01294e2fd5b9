//! Wallet capability.
//!
//! The command pipeline only needs to know which account signs a test
//! transaction, so it sees wallets through the narrow [`WalletContext`]
//! trait. [`UserWallet`] is the JSON-file implementation used by the CLI:
//!
//! ```json
//! {
//!   "name": "dev",
//!   "version": "1.0",
//!   "accounts": [
//!     { "address": "AJQ6FoaSXDFzA6wLnyZ1nFN7SGSN2oNTc3", "label": "main",
//!       "is_default": true, "public_key": "02..." }
//!   ]
//! }
//! ```
//!
//! Accounts without a `public_key` are watch-only.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

use sc_sandbox_types::ScriptHash;

/// Length of a compressed secp256r1 public key.
pub const PUBLIC_KEY_LEN: usize = 33;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    Io { path: PathBuf, message: String },
    Parse(String),
    InvalidPublicKey(String),
    MultipleDefaults,
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletError::Io { path, message } => {
                write!(f, "could not read wallet {}: {}", path.display(), message)
            }
            WalletError::Parse(msg) => write!(f, "invalid wallet file: {}", msg),
            WalletError::InvalidPublicKey(key) => write!(f, "invalid public key '{}'", key),
            WalletError::MultipleDefaults => {
                write!(f, "wallet marks more than one account as default")
            }
        }
    }
}

impl std::error::Error for WalletError {}

/// Compressed public key (`02`/`03` prefix + 32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    pub fn from_hex(s: &str) -> Result<Self, WalletError> {
        let invalid = || WalletError::InvalidPublicKey(s.to_string());
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s)).map_err(|_| invalid())?;
        let array: [u8; PUBLIC_KEY_LEN] = bytes.try_into().map_err(|_| invalid())?;
        if array[0] != 0x02 && array[0] != 0x03 {
            return Err(invalid());
        }
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PublicKey::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAccount {
    pub address: ScriptHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<PublicKey>,
}

impl WalletAccount {
    pub fn is_watch_only(&self) -> bool {
        self.public_key.is_none()
    }
}

/// Read access to the currently open wallet.
pub trait WalletContext {
    fn name(&self) -> &str;

    fn accounts(&self) -> &[WalletAccount];

    /// The account flagged `is_default`, else the first account.
    fn default_account(&self) -> Option<&WalletAccount> {
        let accounts = self.accounts();
        accounts
            .iter()
            .find(|a| a.is_default)
            .or_else(|| accounts.first())
    }

    fn contains(&self, hash: &ScriptHash) -> bool {
        self.accounts().iter().any(|a| a.address == *hash)
    }
}

/// JSON wallet file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserWallet {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub accounts: Vec<WalletAccount>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl UserWallet {
    /// An empty in-memory wallet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            accounts: Vec::new(),
            path: None,
        }
    }

    pub fn with_account(mut self, account: WalletAccount) -> Self {
        self.accounts.push(account);
        self
    }

    pub fn open(path: &Path) -> Result<Self, WalletError> {
        let data = std::fs::read_to_string(path).map_err(|e| WalletError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut wallet = Self::from_json_str(&data)?;
        wallet.path = Some(path.to_path_buf());
        tracing::debug!(
            path = %path.display(),
            accounts = wallet.accounts.len(),
            "opened wallet"
        );
        Ok(wallet)
    }

    pub fn from_json_str(data: &str) -> Result<Self, WalletError> {
        let wallet: UserWallet =
            serde_json::from_str(data).map_err(|e| WalletError::Parse(e.to_string()))?;
        if wallet.accounts.iter().filter(|a| a.is_default).count() > 1 {
            return Err(WalletError::MultipleDefaults);
        }
        Ok(wallet)
    }

    /// File the wallet was opened from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl WalletContext for UserWallet {
    fn name(&self) -> &str {
        &self.name
    }

    fn accounts(&self) -> &[WalletAccount] {
        &self.accounts
    }
}
