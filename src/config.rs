//! Runtime configuration.
//!
//! Values come from the environment first and are then overridden by CLI
//! flags:
//!
//! | variable               | meaning                                   |
//! |------------------------|-------------------------------------------|
//! | `SC_SANDBOX_WALLET`    | wallet file opened at startup             |
//! | `SC_SANDBOX_FREE_GAS`  | free GAS added to the fee in test mode    |
//! | `SC_SANDBOX_MAX_STEPS` | instruction limit per invocation          |
//!
//! Unparseable values are ignored with a warning.

use std::path::PathBuf;
use std::str::FromStr;

use sc_sandbox_core::gas::FREE_GAS;
use sc_sandbox_core::{EngineLimits, InvokeSettings};
use sc_sandbox_types::Fixed8;
use tracing::warn;

pub const ENV_WALLET: &str = "SC_SANDBOX_WALLET";
pub const ENV_FREE_GAS: &str = "SC_SANDBOX_FREE_GAS";
pub const ENV_MAX_STEPS: &str = "SC_SANDBOX_MAX_STEPS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxConfig {
    pub wallet: Option<PathBuf>,
    pub free_gas: Fixed8,
    pub limits: EngineLimits,
    pub json: bool,
    pub verbose: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            wallet: None,
            free_gas: FREE_GAS,
            limits: EngineLimits::default(),
            json: false,
            verbose: false,
        }
    }
}

impl SandboxConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup(ENV_WALLET).filter(|p| !p.trim().is_empty()) {
            config.wallet = Some(PathBuf::from(path));
        }
        if let Some(free_gas) = parse_var::<Fixed8>(&lookup, ENV_FREE_GAS) {
            if free_gas.is_negative() {
                warn!(var = ENV_FREE_GAS, "ignoring negative free gas");
            } else {
                config.free_gas = free_gas;
            }
        }
        if let Some(max_steps) = parse_var::<u64>(&lookup, ENV_MAX_STEPS) {
            config.limits.max_steps = max_steps;
        }
        config
    }

    pub fn invoke_settings(&self) -> InvokeSettings {
        InvokeSettings {
            free_gas: self.free_gas,
            limits: self.limits,
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = key, value = %raw, "ignoring unparseable environment variable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SandboxConfig::from_lookup(lookup(&[]));
        assert_eq!(config, SandboxConfig::default());
        assert_eq!(config.invoke_settings(), InvokeSettings::default());
    }

    #[test]
    fn test_env_overrides() {
        let config = SandboxConfig::from_lookup(lookup(&[
            (ENV_WALLET, "/tmp/dev.json"),
            (ENV_FREE_GAS, "2.5"),
            (ENV_MAX_STEPS, "500"),
        ]));
        assert_eq!(config.wallet, Some(PathBuf::from("/tmp/dev.json")));
        assert_eq!(config.free_gas, Fixed8::from_units(250_000_000));
        assert_eq!(config.limits.max_steps, 500);
    }

    #[test]
    fn test_bad_values_are_ignored() {
        let config = SandboxConfig::from_lookup(lookup(&[
            (ENV_FREE_GAS, "-1"),
            (ENV_MAX_STEPS, "lots"),
            (ENV_WALLET, "  "),
        ]));
        assert_eq!(config, SandboxConfig::default());
    }
}
