//! Argument validation for the `sc` subcommands.
//!
//! Grammar after the subcommand name:
//!
//! ```text
//! build     <path>
//! build_run <path> <test_mode> <needs_storage> <payable> <gas_price> <fee> (<arg>... | --i) [options]
//! load_run  <path.avm> ...same as build_run...
//!
//! options: --from-addr=<address>  --owners=[<address>,...]  --attach-gas=<amount>  --no-parse-addr
//! ```
//!
//! Validation runs in two stages. The arity stage only counts positional
//! tokens. The shape stage checks every token against its slot and reports
//! any mismatch as [`CommandError::MalformedFlags`].

use std::path::PathBuf;

use sc_sandbox_types::{Fixed8, ScriptHash};

use super::errors::CommandError;

/// Positional tokens required before call arguments.
pub const REQUIRED_RUN_TOKENS: usize = 6;

/// Call arguments are gathered by prompting.
pub const INTERACTIVE_MARKER: &str = "--i";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subcommand {
    Build,
    BuildRun,
    LoadRun,
    Help,
    Invalid(String),
}

impl Subcommand {
    pub fn parse(token: &str) -> Self {
        match token {
            "build" => Subcommand::Build,
            "build_run" => Subcommand::BuildRun,
            "load_run" => Subcommand::LoadRun,
            "help" => Subcommand::Help,
            other => Subcommand::Invalid(other.to_string()),
        }
    }
}

/// Which run subcommand is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// `build_run`: compile the source first.
    Build,
    /// `load_run`: execute existing bytecode.
    Load,
}

impl RunKind {
    pub fn name(self) -> &'static str {
        match self {
            RunKind::Build => "build_run",
            RunKind::Load => "load_run",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArgs {
    pub path: PathBuf,
}

/// Where call arguments come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamInput {
    Positional(Vec<String>),
    Interactive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub from_addr: Option<ScriptHash>,
    pub owners: Vec<ScriptHash>,
    pub attach_gas: Fixed8,
    /// Convert address-shaped arguments to script hashes.
    pub parse_addresses: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            from_addr: None,
            owners: Vec::new(),
            attach_gas: Fixed8::ZERO,
            parse_addresses: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    pub kind: RunKind,
    pub path: PathBuf,
    pub test_mode: bool,
    pub needs_storage: bool,
    pub payable: bool,
    pub gas_price: Fixed8,
    pub fee: Fixed8,
    pub input: ParamInput,
    pub options: RunOptions,
}

pub fn validate_build(tokens: &[String]) -> Result<BuildArgs, CommandError> {
    match tokens {
        [] => Err(CommandError::MissingParameter),
        [path] if !path.starts_with("--") => Ok(BuildArgs {
            path: PathBuf::from(path),
        }),
        _ => Err(CommandError::MalformedFlags {
            subcommand: "build",
            reason: format!("expected a single source path, got {:?}", tokens),
        }),
    }
}

pub fn validate_run(kind: RunKind, tokens: &[String]) -> Result<RunArgs, CommandError> {
    let malformed = |reason: String| CommandError::MalformedFlags {
        subcommand: kind.name(),
        reason,
    };

    let (options, positional): (Vec<&String>, Vec<&String>) = tokens
        .iter()
        .partition(|t| t.starts_with("--") && t.as_str() != INTERACTIVE_MARKER);

    if positional.len() < REQUIRED_RUN_TOKENS {
        return Err(CommandError::MissingParameters);
    }

    let path = PathBuf::from(positional[0]);
    if kind == RunKind::Load && path.extension().and_then(|e| e.to_str()) != Some("avm") {
        return Err(malformed(format!(
            "{} is not a compiled .avm file",
            path.display()
        )));
    }

    let flag = |index: usize, name: &str| {
        parse_bool(positional[index])
            .ok_or_else(|| malformed(format!("{} must be True or False, got '{}'", name, positional[index])))
    };
    let test_mode = flag(1, "test_mode")?;
    let needs_storage = flag(2, "needs_storage")?;
    let payable = flag(3, "payable")?;

    let gas_price = parse_amount(positional[4]).map_err(|e| malformed(format!("gas price: {}", e)))?;
    let fee = parse_amount(positional[5]).map_err(|e| malformed(format!("fee: {}", e)))?;

    let rest = &positional[REQUIRED_RUN_TOKENS..];
    let input = if rest.iter().any(|t| t.as_str() == INTERACTIVE_MARKER) {
        if rest.len() != 1 {
            return Err(malformed(format!(
                "{} cannot be combined with positional arguments",
                INTERACTIVE_MARKER
            )));
        }
        ParamInput::Interactive
    } else {
        ParamInput::Positional(rest.iter().map(|t| t.to_string()).collect())
    };

    let mut run_options = RunOptions::default();
    for option in options {
        parse_option(option, &mut run_options).map_err(malformed)?;
    }

    Ok(RunArgs {
        kind,
        path,
        test_mode,
        needs_storage,
        payable,
        gas_price,
        fee,
        input,
        options: run_options,
    })
}

fn parse_bool(token: &str) -> Option<bool> {
    if token.eq_ignore_ascii_case("true") {
        Some(true)
    } else if token.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_amount(token: &str) -> Result<Fixed8, String> {
    let amount: Fixed8 = token.parse().map_err(|e| format!("{}", e))?;
    if amount.is_negative() {
        return Err(format!("amount '{}' must not be negative", token));
    }
    Ok(amount)
}

fn parse_address(token: &str) -> Result<ScriptHash, String> {
    ScriptHash::from_address(token).map_err(|e| format!("'{}': {}", token, e))
}

fn parse_option(option: &str, out: &mut RunOptions) -> Result<(), String> {
    if option == "--no-parse-addr" {
        out.parse_addresses = false;
        return Ok(());
    }

    let Some((name, value)) = option.split_once('=') else {
        return Err(format!("unknown option {}", option));
    };
    match name {
        "--from-addr" => out.from_addr = Some(parse_address(value)?),
        "--owners" => {
            let list = value
                .trim()
                .strip_prefix('[')
                .and_then(|v| v.strip_suffix(']'))
                .unwrap_or(value);
            for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                out.owners.push(parse_address(entry.trim_matches(|c| c == '\'' || c == '"'))?);
            }
        }
        "--attach-gas" => out.attach_gas = parse_amount(value)?,
        _ => return Err(format!("unknown option {}", name)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "AG4GfwjnvydAZodm4xEDivguCtjCFzLcJy";
    const WALLET_ADDR: &str = "AJQ6FoaSXDFzA6wLnyZ1nFN7SGSN2oNTc3";

    fn tokens(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn is_malformed(result: Result<RunArgs, CommandError>) -> bool {
        matches!(result, Err(CommandError::MalformedFlags { .. }))
    }

    #[test]
    fn test_subcommand_parse() {
        assert_eq!(Subcommand::parse("build"), Subcommand::Build);
        assert_eq!(Subcommand::parse("load_run"), Subcommand::LoadRun);
        assert_eq!(
            Subcommand::parse("Build"),
            Subcommand::Invalid("Build".to_string())
        );
    }

    #[test]
    fn test_build_arity() {
        assert_eq!(validate_build(&[]), Err(CommandError::MissingParameter));
        assert_eq!(
            validate_build(&tokens("SampleSC.py")).unwrap().path,
            PathBuf::from("SampleSC.py")
        );
        assert!(matches!(
            validate_build(&tokens("a.py b.py")),
            Err(CommandError::MalformedFlags { subcommand: "build", .. })
        ));
    }

    #[test]
    fn test_run_positional() {
        let args = validate_run(
            RunKind::Build,
            &tokens(&format!("SampleSC.py True false FALSE 0.001 2 add {} 3", ADDR)),
        )
        .unwrap();
        assert!(args.test_mode);
        assert!(!args.needs_storage);
        assert!(!args.payable);
        assert_eq!(args.gas_price, Fixed8::from_units(100_000));
        assert_eq!(args.fee, Fixed8::from_whole(2).unwrap());
        assert_eq!(
            args.input,
            ParamInput::Positional(tokens(&format!("add {} 3", ADDR)))
        );
        assert!(args.options.parse_addresses);
    }

    #[test]
    fn test_run_interactive_and_options() {
        let args = validate_run(
            RunKind::Load,
            &tokens(&format!(
                "SampleSC.avm True True False 0 0 --i --from-addr={} --owners=[{},{}] --attach-gas=1.5 --no-parse-addr",
                WALLET_ADDR, ADDR, WALLET_ADDR
            )),
        )
        .unwrap();
        assert_eq!(args.input, ParamInput::Interactive);
        assert_eq!(args.options.from_addr.unwrap().to_address(), WALLET_ADDR);
        assert_eq!(args.options.owners.len(), 2);
        assert_eq!(args.options.attach_gas, Fixed8::from_units(150_000_000));
        assert!(!args.options.parse_addresses);
    }

    #[test]
    fn test_run_arity_comes_before_shape() {
        assert_eq!(
            validate_run(RunKind::Build, &[]),
            Err(CommandError::MissingParameters)
        );
        // options do not count towards arity
        assert_eq!(
            validate_run(RunKind::Build, &tokens("a.py True True --no-parse-addr 1 2")),
            Err(CommandError::MissingParameters)
        );
        assert_eq!(
            validate_run(RunKind::Build, &tokens("a.py True --bogus")),
            Err(CommandError::MissingParameters)
        );
    }

    #[test]
    fn test_run_shape_errors() {
        // payable flag missing: the gas price lands in the payable slot
        assert!(is_malformed(validate_run(
            RunKind::Build,
            &tokens(&format!("SampleSC.py True False 070502 02 add {} 3", ADDR)),
        )));
        assert!(is_malformed(validate_run(
            RunKind::Load,
            &tokens("SampleSC.py True False False 0 0 --i"),
        )));
        assert!(is_malformed(validate_run(
            RunKind::Build,
            &tokens("a.py True False False -1 0 x"),
        )));
        assert!(is_malformed(validate_run(
            RunKind::Build,
            &tokens("a.py True False False 0 0 x --i"),
        )));
        assert!(is_malformed(validate_run(
            RunKind::Build,
            &tokens("a.py True False False 0 0 x --from-addr=nope"),
        )));
        assert!(is_malformed(validate_run(
            RunKind::Build,
            &tokens("a.py True False False 0 0 x --verbose"),
        )));
        assert!(is_malformed(validate_run(
            RunKind::Build,
            &tokens("a.py yes False False 0 0 x"),
        )));
    }
}
