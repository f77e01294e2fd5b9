//! Test transactions.
//!
//! A [`TestTransaction`] binds a contract, its call arguments and a signer
//! taken from the open wallet. It is only ever executed locally and never
//! persisted or broadcast.

use serde::{Serialize, Serializer};
use std::fmt;

use sc_sandbox_types::{hash256, ContractParameter, Fixed8, ScriptHash};

use crate::script::ContractScript;
use crate::vm::stack_item::integer_to_bytes;
use crate::wallet::{PublicKey, WalletContext};

const TX_MAGIC: &[u8] = b"sc-test-tx";
const TX_VERSION: u8 = 1;

// =============================================================================
// Invocation parameters
// =============================================================================

/// Who the transaction is sent as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvokeAs {
    /// The wallet's default account.
    #[default]
    Wallet,
    /// An explicit script address (`--from-addr`).
    Script(ScriptHash),
}

/// Everything needed to compose a test transaction, independent of how the
/// values were gathered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationParameters {
    pub test_mode: bool,
    pub needs_storage: bool,
    pub payable: bool,
    pub gas_price: Fixed8,
    pub fee: Fixed8,
    pub invoke_as: InvokeAs,
    pub args: Vec<ContractParameter>,
    /// Extra accounts accepted by `CheckWitness`.
    pub owners: Vec<ScriptHash>,
    pub attached_gas: Fixed8,
}

impl Default for InvocationParameters {
    fn default() -> Self {
        Self {
            test_mode: true,
            needs_storage: false,
            payable: false,
            gas_price: Fixed8::ZERO,
            fee: Fixed8::ZERO,
            invoke_as: InvokeAs::Wallet,
            args: Vec::new(),
            owners: Vec::new(),
            attached_gas: Fixed8::ZERO,
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// Contract capabilities declared at invocation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ContractProperties {
    pub needs_storage: bool,
    pub payable: bool,
}

impl ContractProperties {
    const HAS_STORAGE: u8 = 0x01;
    const PAYABLE: u8 = 0x04;

    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.needs_storage {
            bits |= Self::HAS_STORAGE;
        }
        if self.payable {
            bits |= Self::PAYABLE;
        }
        bits
    }
}

/// How the sender's witness is provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "key")]
pub enum SignerTag {
    PublicKey(PublicKey),
    Script,
}

/// Double SHA-256 of a transaction's canonical encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash([u8; 32]);

impl TxHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        write!(f, "0x{}", hex::encode(reversed))
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestTransaction {
    pub script: ContractScript,
    pub contract_hash: ScriptHash,
    pub properties: ContractProperties,
    pub args: Vec<ContractParameter>,
    pub sender: ScriptHash,
    pub signer: SignerTag,
    /// Sender first, then extra owners, without duplicates.
    pub witnesses: Vec<ScriptHash>,
    pub gas_price: Fixed8,
    pub fee: Fixed8,
    pub attached_gas: Fixed8,
    pub test_mode: bool,
}

impl TestTransaction {
    /// Canonical byte encoding; the input to [`TestTransaction::hash`].
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(TX_MAGIC);
        out.push(TX_VERSION);
        put_var_bytes(&mut out, &self.script.to_avm_bytes());
        out.push(self.properties.bits());

        put_len(&mut out, self.args.len());
        for arg in &self.args {
            let (tag, bytes) = encode_parameter(arg);
            out.push(tag);
            put_var_bytes(&mut out, &bytes);
        }

        out.extend_from_slice(self.sender.as_bytes());
        match &self.signer {
            SignerTag::PublicKey(key) => {
                out.push(0x01);
                out.extend_from_slice(key.as_bytes());
            }
            SignerTag::Script => out.push(0x00),
        }

        put_len(&mut out, self.witnesses.len());
        for witness in &self.witnesses {
            out.extend_from_slice(witness.as_bytes());
        }

        out.extend_from_slice(&self.gas_price.units().to_le_bytes());
        out.extend_from_slice(&self.fee.units().to_le_bytes());
        out.extend_from_slice(&self.attached_gas.units().to_le_bytes());
        out.push(self.test_mode as u8);
        out
    }

    pub fn hash(&self) -> TxHash {
        TxHash(hash256(&self.encode()))
    }
}

fn put_len(out: &mut Vec<u8>, len: usize) {
    out.extend_from_slice(&(len as u32).to_le_bytes());
}

fn put_var_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    put_len(out, bytes.len());
    out.extend_from_slice(bytes);
}

/// Type tag and value bytes of a parameter.
fn encode_parameter(param: &ContractParameter) -> (u8, Vec<u8>) {
    match param {
        ContractParameter::Boolean(b) => (0x01, vec![*b as u8]),
        ContractParameter::Integer(n) => (0x02, integer_to_bytes(*n)),
        ContractParameter::Hash160(hash) => (0x03, hash.to_vec()),
        ContractParameter::ByteArray(bytes) => (0x05, bytes.clone()),
        ContractParameter::String(s) => (0x07, s.as_bytes().to_vec()),
    }
}

// =============================================================================
// Composer
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    NoWallet,
    /// The wallet holds no accounts to sign with.
    NoDefaultAccount,
    /// GAS was attached to an invocation that did not declare `payable`.
    NotPayable { attached: Fixed8 },
    NegativeAmount { what: &'static str, amount: Fixed8 },
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeError::NoWallet => write!(f, "no wallet is open"),
            ComposeError::NoDefaultAccount => {
                write!(f, "the open wallet has no account to sign with")
            }
            ComposeError::NotPayable { attached } => write!(
                f,
                "cannot attach {} GAS: the contract was not invoked as payable",
                attached
            ),
            ComposeError::NegativeAmount { what, amount } => {
                write!(f, "{} must not be negative (got {})", what, amount)
            }
        }
    }
}

impl std::error::Error for ComposeError {}

pub struct TransactionComposer;

impl TransactionComposer {
    pub fn compose(
        script: &ContractScript,
        params: InvocationParameters,
        wallet: Option<&dyn WalletContext>,
    ) -> Result<TestTransaction, ComposeError> {
        let wallet = wallet.ok_or(ComposeError::NoWallet)?;

        for (what, amount) in [
            ("gas price", params.gas_price),
            ("fee", params.fee),
            ("attached GAS", params.attached_gas),
        ] {
            if amount.is_negative() {
                return Err(ComposeError::NegativeAmount { what, amount });
            }
        }
        if !params.payable && params.attached_gas != Fixed8::ZERO {
            return Err(ComposeError::NotPayable {
                attached: params.attached_gas,
            });
        }

        let (sender, signer) = match params.invoke_as {
            InvokeAs::Script(hash) => (hash, SignerTag::Script),
            InvokeAs::Wallet => {
                let account = wallet
                    .default_account()
                    .ok_or(ComposeError::NoDefaultAccount)?;
                let signer = account
                    .public_key
                    .map(SignerTag::PublicKey)
                    .unwrap_or(SignerTag::Script);
                (account.address, signer)
            }
        };

        let mut witnesses = vec![sender];
        for owner in params.owners {
            if !witnesses.contains(&owner) {
                witnesses.push(owner);
            }
        }

        let tx = TestTransaction {
            script: script.clone(),
            contract_hash: script.script_hash(),
            properties: ContractProperties {
                needs_storage: params.needs_storage,
                payable: params.payable,
            },
            args: params.args,
            sender,
            signer,
            witnesses,
            gas_price: params.gas_price,
            fee: params.fee,
            attached_gas: params.attached_gas,
            test_mode: params.test_mode,
        };
        tracing::debug!(
            tx = %tx.hash(),
            sender = %sender.to_address(),
            wallet = wallet.name(),
            "composed test transaction"
        );
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::{UserWallet, WalletAccount};

    const WALLET_ADDR: &str = "AJQ6FoaSXDFzA6wLnyZ1nFN7SGSN2oNTc3";
    const OTHER_ADDR: &str = "AG4GfwjnvydAZodm4xEDivguCtjCFzLcJy";
    const PUBKEY: &str = "036245f426b4522e8a2901be6ccc1f71e37dc376726cc6665d80c5997e240568fb";

    fn wallet() -> UserWallet {
        UserWallet::new("dev").with_account(WalletAccount {
            address: WALLET_ADDR.parse().unwrap(),
            label: None,
            is_default: true,
            public_key: Some(PublicKey::from_hex(PUBKEY).unwrap()),
        })
    }

    fn script() -> ContractScript {
        ContractScript::new(0, vec![0x44])
    }

    #[test]
    fn test_compose_uses_wallet_default_account() {
        let wallet = wallet();
        let tx = TransactionComposer::compose(
            &script(),
            InvocationParameters::default(),
            Some(&wallet),
        )
        .unwrap();
        assert_eq!(tx.sender.to_address(), WALLET_ADDR);
        assert!(matches!(tx.signer, SignerTag::PublicKey(_)));
        assert_eq!(tx.witnesses, vec![tx.sender]);
        assert_eq!(tx.contract_hash, script().script_hash());
    }

    #[test]
    fn test_compose_from_addr_and_owners() {
        let wallet = wallet();
        let other: ScriptHash = OTHER_ADDR.parse().unwrap();
        let params = InvocationParameters {
            invoke_as: InvokeAs::Script(other),
            owners: vec![other, WALLET_ADDR.parse().unwrap()],
            ..Default::default()
        };
        let tx = TransactionComposer::compose(&script(), params, Some(&wallet)).unwrap();
        assert_eq!(tx.sender, other);
        assert_eq!(tx.signer, SignerTag::Script);
        assert_eq!(tx.witnesses.len(), 2);
    }

    #[test]
    fn test_compose_errors() {
        assert_eq!(
            TransactionComposer::compose(&script(), InvocationParameters::default(), None),
            Err(ComposeError::NoWallet)
        );

        let empty = UserWallet::new("empty");
        assert_eq!(
            TransactionComposer::compose(&script(), InvocationParameters::default(), Some(&empty)),
            Err(ComposeError::NoDefaultAccount)
        );

        let wallet = wallet();
        let params = InvocationParameters {
            attached_gas: Fixed8::ONE,
            ..Default::default()
        };
        assert_eq!(
            TransactionComposer::compose(&script(), params, Some(&wallet)),
            Err(ComposeError::NotPayable {
                attached: Fixed8::ONE
            })
        );
    }

    #[test]
    fn test_hash_is_deterministic_and_sensitive() {
        let wallet = wallet();
        let params = InvocationParameters {
            args: vec![ContractParameter::Integer(3)],
            ..Default::default()
        };
        let a = TransactionComposer::compose(&script(), params.clone(), Some(&wallet)).unwrap();
        let b = TransactionComposer::compose(&script(), params.clone(), Some(&wallet)).unwrap();
        assert_eq!(a.hash(), b.hash());

        let changed = InvocationParameters {
            args: vec![ContractParameter::Integer(4)],
            ..params
        };
        let c = TransactionComposer::compose(&script(), changed, Some(&wallet)).unwrap();
        assert_ne!(a.hash(), c.hash());
        assert!(a.hash().to_string().starts_with("0x"));
        assert_eq!(a.hash().to_string().len(), 66);
    }
}
