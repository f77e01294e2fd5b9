//! CLI subcommand implementations for sc-sandbox

pub mod output;
pub mod sc;
pub mod shell;
pub mod state;

pub use state::SandboxState;
