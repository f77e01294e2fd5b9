//! Failures the `sc` pipeline can hit.
//!
//! Every variant is recovered inside [`super::CommandSc::execute`] and turned
//! into a single user-facing line, so `Display` is exactly the text users see.

use std::fmt;
use std::path::PathBuf;

use sc_sandbox_core::{CompileError, ComposeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// No subcommand given.
    Usage,
    /// First token is not a known subcommand.
    InvalidSubcommand(String),
    /// `build` without a path.
    MissingParameter,
    /// `build_run` / `load_run` with fewer than the six required tokens.
    MissingParameters,
    /// Tokens present but not in the expected shape. `reason` is logged only.
    MalformedFlags {
        subcommand: &'static str,
        reason: String,
    },
    Compile(CompileError),
    /// Bytecode file for `load_run` could not be read.
    Load { path: PathBuf, error: CompileError },
    NoWallet,
    Compose(ComposeError),
    /// Input closed while prompting for parameters.
    PromptClosed,
    /// The VM faulted.
    InvocationFault(String),
}

impl CommandError {
    /// Short machine-readable tag, used in JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            CommandError::Usage | CommandError::InvalidSubcommand(_) => "usage",
            CommandError::MissingParameter | CommandError::MissingParameters => {
                "missing_parameters"
            }
            CommandError::MalformedFlags { .. } => "malformed_flags",
            CommandError::Compile(_) | CommandError::Load { .. } => "compile",
            CommandError::NoWallet => "no_wallet",
            CommandError::Compose(_) => "compose",
            CommandError::PromptClosed => "prompt_closed",
            CommandError::InvocationFault(_) => "invocation_fault",
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Usage => write!(f, "run `sc help` to see supported queries"),
            CommandError::InvalidSubcommand(token) => {
                write!(f, "{} is an invalid parameter", token)
            }
            CommandError::MissingParameter => write!(f, "Please specify the required parameter"),
            CommandError::MissingParameters => {
                write!(f, "Please specify the required parameters")
            }
            CommandError::MalformedFlags { subcommand, .. } => {
                write!(f, "run `sc {} help` to see supported queries", subcommand)
            }
            CommandError::Compile(CompileError::SourceNotFound { .. }) => write!(
                f,
                "Please check the path to your Python (.py) file to compile"
            ),
            CommandError::Compile(e) => write!(f, "Could not compile contract: {}", e),
            CommandError::Load {
                error: CompileError::SourceNotFound { .. },
                ..
            } => write!(f, "Please check the path to your bytecode (.avm) file to load"),
            CommandError::Load { path, error } => {
                write!(f, "Could not load {}: {}", path.display(), error)
            }
            CommandError::NoWallet => write!(f, "Please open a wallet to test build contract"),
            CommandError::Compose(e) => write!(f, "Could not compose test transaction: {}", e),
            CommandError::PromptClosed => {
                write!(f, "Input closed before all parameters were entered")
            }
            CommandError::InvocationFault(reason) => write!(f, "Test invoke failed: {}", reason),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<CompileError> for CommandError {
    fn from(e: CompileError) -> Self {
        CommandError::Compile(e)
    }
}

impl From<ComposeError> for CommandError {
    fn from(e: ComposeError) -> Self {
        CommandError::Compose(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            CommandError::InvalidSubcommand("badcommand".into()).to_string(),
            "badcommand is an invalid parameter"
        );
        assert_eq!(
            CommandError::MalformedFlags {
                subcommand: "load_run",
                reason: "x".into()
            }
            .to_string(),
            "run `sc load_run help` to see supported queries"
        );
        assert_eq!(
            CommandError::Compile(CompileError::SourceNotFound {
                path: "SampleSC.py".into()
            })
            .to_string(),
            "Please check the path to your Python (.py) file to compile"
        );
    }
}
