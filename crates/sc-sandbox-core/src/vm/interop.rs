//! Interop services reachable through `SYSCALL`.
//!
//! The syscall table is shared with the compiler: a builtin call in contract
//! source compiles to `SYSCALL <id>` with the id listed here.
//!
//! | id     | builtin          | pops               | pushes  |
//! |--------|------------------|--------------------|---------|
//! | `0x01` | `GetContext`     | -                  | context |
//! | `0x02` | `Get`            | ctx, key           | value   |
//! | `0x03` | `Put`            | ctx, key, value    | -       |
//! | `0x04` | `Delete`         | ctx, key           | -       |
//! | `0x05` | `Notify`         | state              | -       |
//! | `0x06` | `Log`            | message            | -       |
//! | `0x07` | `CheckWitness`   | hash               | bool    |
//! | `0x08` | `GetAttachedGas` | -                  | integer |

use serde::Serialize;
use std::collections::BTreeMap;

use sc_sandbox_types::{Fixed8, ScriptHash};

use super::stack_item::StackItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    GetContext,
    Get,
    Put,
    Delete,
    Notify,
    Log,
    CheckWitness,
    GetAttachedGas,
}

impl Syscall {
    pub const ALL: [Syscall; 8] = [
        Syscall::GetContext,
        Syscall::Get,
        Syscall::Put,
        Syscall::Delete,
        Syscall::Notify,
        Syscall::Log,
        Syscall::CheckWitness,
        Syscall::GetAttachedGas,
    ];

    pub fn id(self) -> u8 {
        match self {
            Syscall::GetContext => 0x01,
            Syscall::Get => 0x02,
            Syscall::Put => 0x03,
            Syscall::Delete => 0x04,
            Syscall::Notify => 0x05,
            Syscall::Log => 0x06,
            Syscall::CheckWitness => 0x07,
            Syscall::GetAttachedGas => 0x08,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    /// Builtin name as written in contract source.
    pub fn name(self) -> &'static str {
        match self {
            Syscall::GetContext => "GetContext",
            Syscall::Get => "Get",
            Syscall::Put => "Put",
            Syscall::Delete => "Delete",
            Syscall::Notify => "Notify",
            Syscall::Log => "Log",
            Syscall::CheckWitness => "CheckWitness",
            Syscall::GetAttachedGas => "GetAttachedGas",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Number of stack items popped.
    pub fn arity(self) -> usize {
        match self {
            Syscall::GetContext | Syscall::GetAttachedGas => 0,
            Syscall::Notify | Syscall::Log | Syscall::CheckWitness => 1,
            Syscall::Get | Syscall::Delete => 2,
            Syscall::Put => 3,
        }
    }

    pub fn returns_value(self) -> bool {
        matches!(
            self,
            Syscall::GetContext | Syscall::Get | Syscall::CheckWitness | Syscall::GetAttachedGas
        )
    }

    pub fn touches_storage(self) -> bool {
        matches!(
            self,
            Syscall::GetContext | Syscall::Get | Syscall::Put | Syscall::Delete
        )
    }
}

/// What the running contract may observe about its invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    /// Hash of the executing contract; scopes its storage.
    pub script_hash: ScriptHash,
    /// Accounts that `CheckWitness` accepts.
    pub witnesses: Vec<ScriptHash>,
    pub attached_gas: Fixed8,
    pub storage_enabled: bool,
}

/// Event emitted by `Notify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub script_hash: ScriptHash,
    pub state: StackItem,
}

/// Message emitted by `Log`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub script_hash: ScriptHash,
    pub message: String,
}

/// Ephemeral contract storage, private to one engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Storage {
    entries: BTreeMap<(ScriptHash, Vec<u8>), Vec<u8>>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Missing keys read as the empty byte array.
    pub fn get(&self, contract: &ScriptHash, key: &[u8]) -> Vec<u8> {
        self.entries
            .get(&(*contract, key.to_vec()))
            .cloned()
            .unwrap_or_default()
    }

    /// Writing an empty value removes the key.
    pub fn put(&mut self, contract: &ScriptHash, key: Vec<u8>, value: Vec<u8>) {
        if value.is_empty() {
            self.entries.remove(&(*contract, key));
        } else {
            self.entries.insert((*contract, key), value);
        }
    }

    pub fn delete(&mut self, contract: &ScriptHash, key: &[u8]) {
        self.entries.remove(&(*contract, key.to_vec()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries belonging to `contract`, ordered by key.
    pub fn entries_for<'a>(
        &'a self,
        contract: &'a ScriptHash,
    ) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        self.entries
            .iter()
            .filter(move |((owner, _), _)| owner == contract)
            .map(|((_, key), value)| (key.as_slice(), value.as_slice()))
    }
}
