//! Interactive prompt.
//!
//! ```text
//! sc> open wallet dev.json
//! sc> sc build_run SampleSC.py True True False 0 0 --i
//! [operation] > add
//! ...
//! sc> close wallet
//! sc> exit
//! ```
//!
//! `--i` prompts read from the same input as the shell itself. Quoted
//! arguments (`'hello world'`) stay a single token, quotes included, so they
//! reach the contract as strings.

use anyhow::Result;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::debug;

use sc_sandbox::CommandSc;

use super::output::format_json;
use super::SandboxState;

pub const PROMPT: &str = "sc> ";

const SHELL_HELP: &str = "\
open wallet <path>   open a JSON wallet file
close wallet         close the open wallet
sc <args...>         run an sc command (`sc help` for details)
help                 show this message
exit | quit          leave the shell";

#[derive(Debug, PartialEq, Eq)]
enum ShellCommand<'t> {
    Empty,
    Exit,
    Help,
    OpenWallet(&'t str),
    CloseWallet,
    Sc(&'t [String]),
    Unknown(&'t str),
}

impl<'t> ShellCommand<'t> {
    fn parse(tokens: &'t [String]) -> Self {
        let Some((first, rest)) = tokens.split_first() else {
            return ShellCommand::Empty;
        };
        match (first.as_str(), rest) {
            ("exit" | "quit", []) => ShellCommand::Exit,
            ("help", []) => ShellCommand::Help,
            ("open", [what, path]) if what == "wallet" => ShellCommand::OpenWallet(path),
            ("close", [what]) if what == "wallet" => ShellCommand::CloseWallet,
            ("sc", rest) => ShellCommand::Sc(rest),
            (other, _) => ShellCommand::Unknown(other),
        }
    }
}

/// Split a shell line on whitespace, keeping `'...'` and `"..."` runs
/// together. An unterminated quote runs to the end of the line.
fn split_line(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;

    for c in line.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                if c == '\'' || c == '"' {
                    quote = Some(c);
                }
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

pub fn run_shell(
    state: &mut SandboxState,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> Result<()> {
    writeln!(out, "sc-sandbox shell. Type `help` for commands.")?;

    let mut line = String::new();
    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            break;
        }
        let tokens = split_line(&line);

        match ShellCommand::parse(&tokens) {
            ShellCommand::Empty => {}
            ShellCommand::Exit => break,
            ShellCommand::Help => writeln!(out, "{}", SHELL_HELP)?,
            ShellCommand::OpenWallet(path) => match state.open_wallet(Path::new(path)) {
                Ok(wallet) => writeln!(
                    out,
                    "Opened wallet {} ({} accounts)",
                    wallet.name,
                    wallet.accounts.len()
                )?,
                Err(e) => writeln!(out, "{:#}", e)?,
            },
            ShellCommand::CloseWallet => {
                if state.close_wallet() {
                    writeln!(out, "Wallet closed")?;
                } else {
                    writeln!(out, "No wallet is open")?;
                }
            }
            ShellCommand::Sc(args) => {
                let mut sc = CommandSc::new(&mut *out)
                    .with_wallet(state.wallet())
                    .with_prompt_input(&mut *input)
                    .with_settings(state.config.invoke_settings());
                let outcome = sc.execute(Some(args));
                debug!(success = outcome.is_success(), "sc finished");
                let summary = state.config.json.then(|| sc.summary(&outcome));
                drop(sc);
                if let Some(summary) = summary {
                    writeln!(out, "{}", format_json(&summary)?)?;
                }
            }
            ShellCommand::Unknown(command) => {
                writeln!(out, "{} is not a command. Type `help` for commands.", command)?
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_sandbox::SandboxConfig;
    use std::io::Cursor;

    const WALLET: &str = r#"{
        "name": "dev",
        "accounts": [{ "address": "AJQ6FoaSXDFzA6wLnyZ1nFN7SGSN2oNTc3", "is_default": true }]
    }"#;

    fn tokens(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn run(script: &str) -> String {
        let mut state = SandboxState::new(SandboxConfig::default()).unwrap();
        let mut input = Cursor::new(script.to_string());
        let mut out = Vec::new();
        run_shell(&mut state, &mut input, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ShellCommand::parse(&[]), ShellCommand::Empty);
        assert_eq!(ShellCommand::parse(&tokens("quit")), ShellCommand::Exit);
        assert_eq!(
            ShellCommand::parse(&tokens("open wallet dev.json")),
            ShellCommand::OpenWallet("dev.json")
        );
        assert_eq!(
            ShellCommand::parse(&tokens("close wallet")),
            ShellCommand::CloseWallet
        );
        let sc = tokens("sc build a.py");
        assert_eq!(ShellCommand::parse(&sc), ShellCommand::Sc(&sc[1..]));
        assert_eq!(
            ShellCommand::parse(&tokens("open sesame")),
            ShellCommand::Unknown("open")
        );
    }

    #[test]
    fn test_split_line_keeps_quoted_arguments() {
        assert_eq!(
            split_line("sc build_run a.py True False False 0 0 put 'hello world' \"a b\"\n"),
            vec![
                "sc", "build_run", "a.py", "True", "False", "False", "0", "0", "put",
                "'hello world'", "\"a b\"",
            ]
        );
        assert_eq!(split_line("  open   wallet  x.json "), tokens("open wallet x.json"));
        assert_eq!(split_line("say 'it\"s fine'"), vec!["say", "'it\"s fine'"]);
        assert_eq!(split_line("say 'open ended"), vec!["say", "'open ended"]);
        assert!(split_line(" \t\n").is_empty());
    }

    #[test]
    fn test_quoted_argument_reaches_contract_as_one_string() {
        let dir = tempfile::tempdir().unwrap();
        let wallet_path = dir.path().join("dev.json");
        std::fs::write(&wallet_path, WALLET).unwrap();
        let source = dir.path().join("Echo.py");
        std::fs::write(&source, "def Main(a):\n    return a\n").unwrap();

        let transcript = run(&format!(
            "open wallet {}\nsc build_run {} True False False 0 0 'hello world'\n",
            wallet_path.display(),
            source.display()
        ));
        assert!(transcript.contains("Test deploy invoke successful"));
        assert!(transcript.contains("Results: [b'hello world']"));
    }

    #[test]
    fn test_wallet_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let wallet_path = dir.path().join("dev.json");
        std::fs::write(&wallet_path, WALLET).unwrap();
        let source = dir.path().join("Echo.py");
        std::fs::write(&source, "def Main(a):\n    return a\n").unwrap();

        let run_cmd = format!("sc build_run {} True False False 0 0 5", source.display());
        let transcript = run(&format!(
            "{run}\nopen wallet {wallet}\n{run}\nclose wallet\n{run}\nexit\n",
            run = run_cmd,
            wallet = wallet_path.display()
        ));

        assert!(transcript.contains("Opened wallet dev (1 accounts)"));
        assert!(transcript.contains("Wallet closed"));
        assert_eq!(
            transcript
                .matches("Please open a wallet to test build contract")
                .count(),
            2
        );
        assert_eq!(transcript.matches("Test deploy invoke successful").count(), 1);
        assert!(transcript.contains("Results: [5]"));
    }

    #[test]
    fn test_interactive_prompts_share_input() {
        let dir = tempfile::tempdir().unwrap();
        let wallet_path = dir.path().join("dev.json");
        std::fs::write(&wallet_path, WALLET).unwrap();
        let source = dir.path().join("Sub.py");
        std::fs::write(&source, "def Main(a, b):\n    return a - b\n").unwrap();

        let transcript = run(&format!(
            "open wallet {}\nsc build_run {} True False False 0 0 --i\n10\n4\n",
            wallet_path.display(),
            source.display()
        ));
        assert!(transcript.contains("[a] > "));
        assert!(transcript.contains("Results: [6]"));
    }

    #[test]
    fn test_open_missing_wallet_keeps_running() {
        let transcript = run("open wallet /nonexistent/dev.json\nhelp\n");
        assert!(transcript.contains("Failed to open wallet"));
        assert!(transcript.contains("close wallet"));
    }
}
