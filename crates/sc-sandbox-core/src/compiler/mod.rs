//! Contract compiler.
//!
//! Turns a `.py` contract source into a [`ContractScript`] plus [`DebugInfo`].
//! [`build_contract`] additionally writes the two artifacts next to the
//! source:
//!
//! ```text
//! SampleSC.py  ->  SampleSC.avm
//!                  SampleSC.debug.json
//! ```
//!
//! The pipeline only depends on the [`Compiler`] trait, so tests can plug in
//! a canned compiler.

pub mod ast;
pub mod codegen;
pub mod lexer;
pub mod parser;

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::debug_info::{AvmInfo, CompilerInfo, DebugInfo, SourceFile};
use crate::script::ContractScript;

pub use codegen::ENTRY_POINT;

/// Extension of compiled bytecode files.
pub const AVM_EXTENSION: &str = "avm";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The source path does not name a readable file.
    SourceNotFound { path: PathBuf },
    /// Reading the source or writing an artifact failed.
    Io { path: PathBuf, message: String },
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
    Semantic { line: usize, message: String },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::SourceNotFound { path } => {
                write!(f, "source file {} not found", path.display())
            }
            CompileError::Io { path, message } => write!(f, "{}: {}", path.display(), message),
            CompileError::Syntax {
                line,
                column,
                message,
            } => write!(f, "syntax error at line {}, column {}: {}", line, column, message),
            CompileError::Semantic { line: 0, message } => write!(f, "{}", message),
            CompileError::Semantic { line, message } => write!(f, "line {}: {}", line, message),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<lexer::LexError> for CompileError {
    fn from(e: lexer::LexError) -> Self {
        CompileError::Syntax {
            line: e.line,
            column: e.col,
            message: e.message,
        }
    }
}

impl From<parser::ParseError> for CompileError {
    fn from(e: parser::ParseError) -> Self {
        CompileError::Syntax {
            line: e.line,
            column: e.col,
            message: e.message,
        }
    }
}

fn io_error(path: &Path, e: impl fmt::Display) -> CompileError {
    CompileError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

// =============================================================================
// Compiler capability
// =============================================================================

/// Output of a successful compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOutput {
    pub script: ContractScript,
    pub debug: DebugInfo,
}

/// Source path in, bytecode and debug metadata out.
pub trait Compiler {
    fn compile(&self, source_path: &Path) -> Result<CompilerOutput, CompileError>;
}

/// The built-in compiler for the contract language.
#[derive(Debug, Clone, Default)]
pub struct ScriptCompiler;

impl ScriptCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile source text. `name` becomes the contract name and `url` the
    /// file reference recorded in the debug metadata.
    pub fn compile_str(
        &self,
        name: &str,
        url: &str,
        source: &str,
    ) -> Result<CompilerOutput, CompileError> {
        let tokens = lexer::Lexer::tokenize(source)?;
        let module = parser::Parser::new(tokens).parse_module()?;
        let generated = codegen::generate(&module)?;

        let hash = generated.script.script_hash();
        debug!(
            contract = name,
            functions = generated.functions.len(),
            code_len = generated.script.code.len(),
            %hash,
            "compiled contract"
        );

        let debug = DebugInfo {
            avm: AvmInfo {
                name: name.to_string(),
                hash: hash.to_string(),
            },
            compiler: CompilerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            files: vec![SourceFile {
                id: 1,
                url: url.to_string(),
            }],
            entry_point: generated.entry_point,
            functions: generated.functions,
            map: generated.map,
        };

        Ok(CompilerOutput {
            script: generated.script,
            debug,
        })
    }
}

impl Compiler for ScriptCompiler {
    fn compile(&self, source_path: &Path) -> Result<CompilerOutput, CompileError> {
        if !source_path.is_file() {
            return Err(CompileError::SourceNotFound {
                path: source_path.to_path_buf(),
            });
        }
        let source = std::fs::read_to_string(source_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CompileError::SourceNotFound {
                path: source_path.to_path_buf(),
            },
            _ => io_error(source_path, e),
        })?;
        self.compile_str(
            &contract_name(source_path),
            &source_path.display().to_string(),
            &source,
        )
    }
}

/// Contract name derived from a path: the file stem.
pub fn contract_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "contract".to_string())
}

// =============================================================================
// Build
// =============================================================================

/// A compiled contract and where its artifacts were written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledContract {
    pub source_path: PathBuf,
    pub script: ContractScript,
    pub debug: DebugInfo,
    /// `<stem>.avm` next to the source.
    pub output_path: PathBuf,
    pub debug_path: PathBuf,
}

/// Compile `source_path` and write `<stem>.avm` and `<stem>.debug.json`
/// beside it. Nothing is written when compilation fails.
pub fn build_contract(
    compiler: &dyn Compiler,
    source_path: &Path,
) -> Result<CompiledContract, CompileError> {
    let output = compiler.compile(source_path)?;

    let output_path = source_path.with_extension(AVM_EXTENSION);
    let debug_path = DebugInfo::sidecar_path(source_path);
    let debug_bytes = output
        .debug
        .to_json_bytes()
        .map_err(|e| io_error(&debug_path, e))?;

    let avm_bytes = output.script.to_avm_bytes();
    write_artifacts(&[
        (output_path.as_path(), avm_bytes.as_slice()),
        (debug_path.as_path(), debug_bytes.as_slice()),
    ])?;

    info!(path = %output_path.display(), "saved contract bytecode");
    Ok(CompiledContract {
        source_path: source_path.to_path_buf(),
        script: output.script,
        debug: output.debug,
        output_path,
        debug_path,
    })
}

/// Load previously built bytecode, with its debug sidecar when present.
pub fn load_contract(avm_path: &Path) -> Result<(ContractScript, Option<DebugInfo>), CompileError> {
    let bytes = std::fs::read(avm_path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CompileError::SourceNotFound {
            path: avm_path.to_path_buf(),
        },
        _ => io_error(avm_path, e),
    })?;
    let script = ContractScript::from_avm_bytes(&bytes).map_err(|e| io_error(avm_path, e))?;
    Ok((script, DebugInfo::load_sidecar(avm_path)))
}

/// Stage every artifact in a temp file beside its target, then rename them
/// into place. A failure before the renames leaves the old files untouched.
fn write_artifacts(artifacts: &[(&Path, &[u8])]) -> Result<(), CompileError> {
    let mut staged = Vec::with_capacity(artifacts.len());
    for (path, bytes) in artifacts {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| io_error(path, e))?;
        tmp.write_all(bytes).map_err(|e| io_error(path, e))?;
        tmp.flush().map_err(|e| io_error(path, e))?;
        staged.push((tmp, *path));
    }

    let mut persisted: Vec<&Path> = Vec::new();
    for (tmp, path) in staged {
        if let Err(e) = tmp.persist(path) {
            for done in persisted {
                let _ = std::fs::remove_file(done);
            }
            return Err(io_error(path, e.error));
        }
        persisted.push(path);
    }
    Ok(())
}
