//! SC Sandbox
//!
//! Developer command surface for compiling contracts and test-invoking them
//! against a local VM, without broadcasting anything.
//!
//! - [`sc`]: the `sc build` / `build_run` / `load_run` command pipeline
//! - [`config`]: environment and flag configuration
//!
//! The compiler, VM, wallet and transaction types live in
//! [`sc_sandbox_core`]; shared value types in [`sc_sandbox_types`].

pub mod config;
pub mod sc;

pub use config::SandboxConfig;
pub use sc::{CommandError, CommandSc, ScOutcome};
