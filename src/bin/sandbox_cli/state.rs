//! Session state for sc-sandbox.
//!
//! Holds the resolved configuration and the currently open wallet. Nothing is
//! persisted between invocations.

use anyhow::{Context, Result};
use std::path::Path;

use sc_sandbox::SandboxConfig;
use sc_sandbox_core::{UserWallet, WalletContext};

pub struct SandboxState {
    pub config: SandboxConfig,
    wallet: Option<UserWallet>,
}

impl SandboxState {
    /// Build the session, opening the configured wallet if any.
    pub fn new(config: SandboxConfig) -> Result<Self> {
        let mut state = Self {
            config,
            wallet: None,
        };
        if let Some(path) = state.config.wallet.clone() {
            state.open_wallet(&path)?;
        }
        Ok(state)
    }

    pub fn open_wallet(&mut self, path: &Path) -> Result<&UserWallet> {
        let wallet = UserWallet::open(path)
            .with_context(|| format!("Failed to open wallet {}", path.display()))?;
        Ok(&*self.wallet.insert(wallet))
    }

    /// Returns whether a wallet was open.
    pub fn close_wallet(&mut self) -> bool {
        self.wallet.take().is_some()
    }

    pub fn wallet(&self) -> Option<&dyn WalletContext> {
        self.wallet.as_ref().map(|w| w as &dyn WalletContext)
    }
}
