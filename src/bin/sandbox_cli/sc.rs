//! `sc-sandbox sc <tokens…>`: one-shot `sc` command.

use anyhow::Result;
use clap::Args;
use std::io::Write;

use sc_sandbox::CommandSc;

use super::output::print_summary;
use super::SandboxState;

#[derive(Args)]
pub struct ScCmd {
    /// Subcommand and its arguments, e.g. `build_run SampleSC.py True False False 0 0 --i`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub tokens: Vec<String>,
}

impl ScCmd {
    /// Returns whether the command succeeded.
    pub fn execute(&self, state: &SandboxState) -> Result<bool> {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();

        // in JSON mode stdout carries only the summary
        let mut out: Box<dyn Write> = if state.config.json {
            Box::new(std::io::stderr().lock())
        } else {
            Box::new(std::io::stdout().lock())
        };

        let mut sc = CommandSc::new(&mut *out)
            .with_wallet(state.wallet())
            .with_prompt_input(&mut input)
            .with_settings(state.config.invoke_settings());
        let outcome = sc.execute(Some(&self.tokens));

        if state.config.json {
            print_summary(&sc.summary(&outcome))?;
        }
        Ok(outcome.is_success())
    }
}
