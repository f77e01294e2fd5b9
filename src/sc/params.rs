//! Invocation parameter resolution.
//!
//! Positional tokens and interactive answers are both raw strings; they are
//! converted to [`ContractParameter`] values in one place, [`resolve`].

use std::io::{BufRead, Write};

use sc_sandbox_core::debug_info::DebugInfo;
use sc_sandbox_core::script::ContractScript;
use sc_sandbox_types::ContractParameter;
use tracing::{debug, trace};

use super::errors::CommandError;

/// One declared entry point parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub label: String,
}

impl ParamSpec {
    /// Parameters of the entry point, named from the debug sidecar when it
    /// agrees with the bytecode, otherwise `Param 1..n`.
    pub fn for_entry(script: &ContractScript, debug: Option<&DebugInfo>) -> Vec<ParamSpec> {
        let arity = script.entry_arity as usize;
        match debug {
            Some(info) if info.entry_point.params.len() == arity => info
                .entry_point
                .params
                .iter()
                .map(|name| ParamSpec {
                    label: name.clone(),
                })
                .collect(),
            _ => (1..=arity)
                .map(|n| ParamSpec {
                    label: format!("Param {}", n),
                })
                .collect(),
        }
    }
}

/// Supplies raw argument tokens for an invocation.
pub trait ParameterSource {
    fn gather(&mut self, specs: &[ParamSpec]) -> Result<Vec<String>, CommandError>;
}

/// Tokens given on the command line. The count is not checked here; the VM
/// faults on an arity mismatch.
#[derive(Debug, Clone)]
pub struct PositionalSource {
    tokens: Vec<String>,
}

impl PositionalSource {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }
}

impl ParameterSource for PositionalSource {
    fn gather(&mut self, _specs: &[ParamSpec]) -> Result<Vec<String>, CommandError> {
        Ok(std::mem::take(&mut self.tokens))
    }
}

/// Prompts `[<label>] > ` once per parameter and reads one line per answer.
pub struct InteractiveSource<'a> {
    input: &'a mut dyn BufRead,
    out: &'a mut dyn Write,
}

impl<'a> InteractiveSource<'a> {
    pub fn new(input: &'a mut dyn BufRead, out: &'a mut dyn Write) -> Self {
        Self { input, out }
    }
}

impl ParameterSource for InteractiveSource<'_> {
    fn gather(&mut self, specs: &[ParamSpec]) -> Result<Vec<String>, CommandError> {
        let mut answers = Vec::with_capacity(specs.len());
        for param in specs {
            write!(self.out, "[{}] > ", param.label).map_err(|_| CommandError::PromptClosed)?;
            self.out.flush().map_err(|_| CommandError::PromptClosed)?;

            let mut line = String::new();
            let read = self
                .input
                .read_line(&mut line)
                .map_err(|_| CommandError::PromptClosed)?;
            if read == 0 {
                debug!(param = %param.label, "input closed while prompting");
                return Err(CommandError::PromptClosed);
            }
            // keep the transcript readable when input is not a terminal
            writeln!(self.out).map_err(|_| CommandError::PromptClosed)?;

            let answer = line.trim_end_matches(['\r', '\n']).to_string();
            trace!(param = %param.label, answer = %answer, "prompt answered");
            answers.push(answer);
        }
        Ok(answers)
    }
}

/// Convert raw tokens to contract parameters.
pub fn resolve(tokens: &[String], parse_addresses: bool) -> Vec<ContractParameter> {
    tokens
        .iter()
        .map(|t| ContractParameter::parse_token(t, parse_addresses))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn script(arity: u8) -> ContractScript {
        ContractScript::new(arity, vec![])
    }

    #[test]
    fn test_specs_fall_back_to_numbered_labels() {
        let specs = ParamSpec::for_entry(&script(2), None);
        assert_eq!(
            specs.iter().map(|s| s.label.as_str()).collect::<Vec<_>>(),
            vec!["Param 1", "Param 2"]
        );
    }

    #[test]
    fn test_interactive_prompts_each_param() {
        let specs = vec![
            ParamSpec {
                label: "operation".into(),
            },
            ParamSpec {
                label: "value".into(),
            },
        ];
        let mut input = Cursor::new("add\n3\r\n");
        let mut out = Vec::new();
        let answers = InteractiveSource::new(&mut input, &mut out)
            .gather(&specs)
            .unwrap();
        assert_eq!(answers, vec!["add".to_string(), "3".to_string()]);

        let transcript = String::from_utf8(out).unwrap();
        assert!(transcript.contains("[operation] > "));
        assert!(transcript.contains("[value] > "));
    }

    #[test]
    fn test_interactive_eof_aborts() {
        let specs = ParamSpec::for_entry(&script(3), None);
        let mut input = Cursor::new("only-one\n");
        let mut out = Vec::new();
        let result = InteractiveSource::new(&mut input, &mut out).gather(&specs);
        assert_eq!(result, Err(CommandError::PromptClosed));
    }

    #[test]
    fn test_positional_and_interactive_resolve_equally() {
        let specs = ParamSpec::for_entry(&script(3), None);
        let tokens = vec![
            "add".to_string(),
            "AG4GfwjnvydAZodm4xEDivguCtjCFzLcJy".to_string(),
            "3".to_string(),
        ];
        let positional = PositionalSource::new(tokens.clone())
            .gather(&specs)
            .unwrap();

        let mut input = Cursor::new(tokens.join("\n") + "\n");
        let mut out = Vec::new();
        let interactive = InteractiveSource::new(&mut input, &mut out)
            .gather(&specs)
            .unwrap();

        assert_eq!(resolve(&positional, true), resolve(&interactive, true));
        assert!(matches!(
            resolve(&positional, true)[1],
            ContractParameter::Hash160(_)
        ));
        assert!(matches!(
            resolve(&positional, false)[1],
            ContractParameter::String(_)
        ));
    }
}
