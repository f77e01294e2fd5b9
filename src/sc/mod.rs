//! The `sc` command: build, build_run and load_run.
//!
//! [`CommandSc`] is the single entry point. It owns nothing: the output
//! sink, the open wallet, the prompt input and the compiler are all borrowed
//! from the caller, which keeps the pipeline usable from the CLI, the shell
//! and tests alike.
//!
//! Checks run cheapest first:
//!
//! ```text
//! argument shape -> wallet -> compile / load -> parameters -> compose -> execute
//! ```
//!
//! Every failure is reported on the sink and recovered; nothing propagates
//! out of [`CommandSc::execute`].

pub mod args;
pub mod errors;
pub mod output;
pub mod params;

use std::io::{BufRead, Write};
use std::path::Path;

use sc_sandbox_core::compiler::{build_contract, load_contract, CompiledContract};
use sc_sandbox_core::debug_info::DebugInfo;
use sc_sandbox_core::script::ContractScript;
use sc_sandbox_core::{
    Compiler, ExecutionResult, InvocationParameters, InvokeAs, InvokeSettings, ScriptCompiler,
    TestInvoker, TransactionComposer, WalletContext,
};
use tracing::{debug, info};

pub use args::{ParamInput, RunArgs, RunKind, RunOptions, Subcommand};
pub use errors::CommandError;
pub use output::OutcomeSummary;
pub use params::{InteractiveSource, ParamSpec, ParameterSource, PositionalSource};

use output::emit;

static DEFAULT_COMPILER: ScriptCompiler = ScriptCompiler;

pub const USAGE: &str = "\
sc build <path>
sc build_run <path> <test_mode> <needs_storage> <payable> <gas_price> <fee> (<arg>... | --i) [options]
sc load_run <path.avm> <test_mode> <needs_storage> <payable> <gas_price> <fee> (<arg>... | --i) [options]
sc help";

pub const BUILD_USAGE: &str = "\
sc build <path>
    Compile a contract source and save <name>.avm and <name>.debug.json next to it.";

pub const RUN_USAGE: &str = "\
sc {build_run|load_run} <path> <test_mode> <needs_storage> <payable> <gas_price> <fee> (<arg>... | --i) [options]
    test_mode, needs_storage, payable   True or False
    gas_price, fee                      GAS amounts, e.g. 070502 02; test mode charges base
                                        prices and adds 10 free GAS to the fee
    <arg>...                            call arguments for the contract entry point
    --i                                 prompt for each argument instead
options:
    --from-addr=<address>               invoke as this address instead of the wallet's default account
    --owners=[<address>,...]            extra accounts accepted by CheckWitness
    --attach-gas=<amount>               GAS attached to the call, requires payable
    --no-parse-addr                     pass addresses as plain strings";

/// What [`CommandSc::execute`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScOutcome {
    /// `build`, `help`, an invalid subcommand, or no subcommand at all.
    Done(bool),
    /// `build_run` / `load_run`.
    Invoked(ExecutionResult),
}

impl ScOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            ScOutcome::Done(ok) => *ok,
            ScOutcome::Invoked(result) => result.is_success(),
        }
    }

    pub fn into_result(self) -> Option<ExecutionResult> {
        match self {
            ScOutcome::Invoked(result) => Some(result),
            ScOutcome::Done(_) => None,
        }
    }
}

pub struct CommandSc<'a> {
    out: &'a mut dyn Write,
    wallet: Option<&'a dyn WalletContext>,
    input: Option<&'a mut dyn BufRead>,
    compiler: &'a dyn Compiler,
    invoker: TestInvoker,
    last_error: Option<CommandError>,
    last_debug: Option<DebugInfo>,
}

impl<'a> CommandSc<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        Self {
            out,
            wallet: None,
            input: None,
            compiler: &DEFAULT_COMPILER,
            invoker: TestInvoker::default(),
            last_error: None,
            last_debug: None,
        }
    }

    pub fn with_wallet(mut self, wallet: Option<&'a dyn WalletContext>) -> Self {
        self.wallet = wallet;
        self
    }

    /// Input read by `--i` prompts.
    pub fn with_prompt_input(mut self, input: &'a mut dyn BufRead) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_compiler(mut self, compiler: &'a dyn Compiler) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_settings(mut self, settings: InvokeSettings) -> Self {
        self.invoker = TestInvoker::new(settings);
        self
    }

    /// Error that ended the last run, including VM faults.
    pub fn last_error(&self) -> Option<&CommandError> {
        self.last_error.as_ref()
    }

    /// JSON-ready summary of `outcome`, which must come from the last run.
    pub fn summary(&self, outcome: &ScOutcome) -> OutcomeSummary {
        output::summarize(outcome, self.last_error.as_ref(), self.last_debug.as_ref())
    }

    pub fn execute(&mut self, args: Option<&[String]>) -> ScOutcome {
        self.last_error = None;
        self.last_debug = None;

        let Some((first, rest)) = args.and_then(|a| a.split_first()) else {
            return self.fail_done(CommandError::Usage);
        };
        debug!(subcommand = %first, args = rest.len(), "sc");

        match Subcommand::parse(first) {
            Subcommand::Help => {
                emit(self.out, USAGE);
                ScOutcome::Done(true)
            }
            Subcommand::Invalid(token) => self.fail_done(CommandError::InvalidSubcommand(token)),
            Subcommand::Build => {
                if is_help(rest) {
                    emit(self.out, BUILD_USAGE);
                    return ScOutcome::Done(false);
                }
                match self.build(rest) {
                    Ok(_) => ScOutcome::Done(true),
                    Err(e) => self.fail_done(e),
                }
            }
            Subcommand::BuildRun => self.execute_run(RunKind::Build, rest),
            Subcommand::LoadRun => self.execute_run(RunKind::Load, rest),
        }
    }

    fn execute_run(&mut self, kind: RunKind, tokens: &[String]) -> ScOutcome {
        if is_help(tokens) {
            emit(self.out, RUN_USAGE);
            return ScOutcome::Invoked(ExecutionResult::empty());
        }
        match self.run(kind, tokens) {
            Ok(result) => ScOutcome::Invoked(result),
            Err(e) => {
                self.report_error(e);
                ScOutcome::Invoked(ExecutionResult::empty())
            }
        }
    }

    fn build(&mut self, tokens: &[String]) -> Result<CompiledContract, CommandError> {
        let args = args::validate_build(tokens)?;
        self.compile(&args.path)
    }

    fn compile(&mut self, path: &Path) -> Result<CompiledContract, CommandError> {
        let built = build_contract(self.compiler, path)?;
        emit(
            self.out,
            format_args!("Saved output to {}", built.output_path.display()),
        );
        Ok(built)
    }

    fn run(&mut self, kind: RunKind, tokens: &[String]) -> Result<ExecutionResult, CommandError> {
        let args = args::validate_run(kind, tokens)?;
        let wallet = self.wallet.ok_or(CommandError::NoWallet)?;

        let (script, debug_info) = self.acquire(&args)?;
        let specs = ParamSpec::for_entry(&script, debug_info.as_ref());
        let raw = match args.input {
            ParamInput::Positional(tokens) => PositionalSource::new(tokens).gather(&specs)?,
            ParamInput::Interactive => {
                let input = self.input.as_deref_mut().ok_or(CommandError::PromptClosed)?;
                InteractiveSource::new(input, &mut *self.out).gather(&specs)?
            }
        };

        let options = args.options;
        let params = InvocationParameters {
            test_mode: args.test_mode,
            needs_storage: args.needs_storage,
            payable: args.payable,
            gas_price: args.gas_price,
            fee: args.fee,
            invoke_as: options
                .from_addr
                .map(InvokeAs::Script)
                .unwrap_or_default(),
            args: params::resolve(&raw, options.parse_addresses),
            owners: options.owners,
            attached_gas: options.attach_gas,
        };
        debug!(
            args = params.args.len(),
            test_mode = params.test_mode,
            needs_storage = params.needs_storage,
            "resolved invocation parameters"
        );

        let tx = TransactionComposer::compose(&script, params, Some(wallet))?;
        let result = self.invoker.run(tx);

        output::report_execution(self.out, &result, debug_info.as_ref());
        if !result.is_success() {
            let reason = result
                .engine
                .as_ref()
                .and_then(|e| e.fault())
                .map(|f| f.to_string())
                .unwrap_or_default();
            self.last_error = Some(CommandError::InvocationFault(reason));
        }
        self.last_debug = debug_info;
        Ok(result)
    }

    /// Compile or load the contract for a run.
    fn acquire(
        &mut self,
        args: &RunArgs,
    ) -> Result<(ContractScript, Option<DebugInfo>), CommandError> {
        match args.kind {
            RunKind::Build => {
                let built = self.compile(&args.path)?;
                Ok((built.script, Some(built.debug)))
            }
            RunKind::Load => {
                let (script, debug_info) =
                    load_contract(&args.path).map_err(|error| CommandError::Load {
                        path: args.path.clone(),
                        error,
                    })?;
                info!(
                    path = %args.path.display(),
                    hash = %script.script_hash(),
                    sidecar = debug_info.is_some(),
                    "loaded contract bytecode"
                );
                Ok((script, debug_info))
            }
        }
    }

    fn report_error(&mut self, error: CommandError) {
        if let CommandError::MalformedFlags { reason, .. } = &error {
            debug!(reason = %reason, "malformed sc arguments");
        }
        emit(self.out, &error);
        self.last_error = Some(error);
    }

    fn fail_done(&mut self, error: CommandError) -> ScOutcome {
        self.report_error(error);
        ScOutcome::Done(false)
    }
}

fn is_help(tokens: &[String]) -> bool {
    matches!(tokens, [only] if only == "help")
}
