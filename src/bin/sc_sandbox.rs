//! sc-sandbox: compile and test-invoke contracts locally
//!
//! ## Example Usage
//!
//! ```bash
//! # Compile a contract
//! sc-sandbox sc build ./SampleSC.py
//!
//! # Compile and test-invoke it with the wallet's default account
//! sc-sandbox --wallet dev.json sc build_run ./SampleSC.py True True False 0 0 add AG4Gfwj... 3
//!
//! # Invoke existing bytecode, prompting for each argument
//! sc-sandbox --wallet dev.json sc load_run ./SampleSC.avm True True False 0 0 --i
//!
//! # Interactive prompt with `open wallet` / `close wallet`
//! sc-sandbox shell
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sc_sandbox::SandboxConfig;
use sc_sandbox_types::Fixed8;
use tracing_subscriber::EnvFilter;

mod sandbox_cli;

use sandbox_cli::{sc::ScCmd, SandboxState};

#[derive(Parser)]
#[command(
    name = "sc-sandbox",
    author,
    version,
    about = "Local contract build and test-invoke environment",
    long_about = "Compile contracts, load their bytecode and test-invoke them against a local VM.\n\n\
                  Nothing is broadcast; storage and transactions live only for one run."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Wallet file to open (overrides SC_SANDBOX_WALLET)
    #[arg(long, global = true)]
    wallet: Option<PathBuf>,

    /// Print a JSON summary on stdout; command messages move to stderr
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (debug logging on stderr)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Free GAS added to the fee in test mode (overrides SC_SANDBOX_FREE_GAS)
    #[arg(long, global = true)]
    free_gas: Option<Fixed8>,

    /// Instruction limit per invocation (overrides SC_SANDBOX_MAX_STEPS)
    #[arg(long, global = true)]
    max_steps: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one `sc` command: build, build_run, load_run or help
    Sc(ScCmd),

    /// Interactive prompt accepting `sc ...`, `open wallet <path>` and `close wallet`
    Shell,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> Result<bool> {
    let Cli {
        command,
        wallet,
        json,
        verbose,
        free_gas,
        max_steps,
    } = cli;

    let mut config = SandboxConfig::from_env();
    if wallet.is_some() {
        config.wallet = wallet;
    }
    if let Some(free_gas) = free_gas {
        config.free_gas = free_gas;
    }
    if let Some(max_steps) = max_steps {
        config.limits.max_steps = max_steps;
    }
    config.json = json;
    config.verbose = verbose;

    let mut state = SandboxState::new(config)?;
    match command {
        Commands::Sc(cmd) => cmd.execute(&state),
        Commands::Shell => {
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            sandbox_cli::shell::run_shell(&mut state, &mut input, &mut out)?;
            Ok(true)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            let _ = std::io::stdout().flush();
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
