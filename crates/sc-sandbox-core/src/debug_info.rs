//! `.debug.json` sidecar written next to every `.avm` file.
//!
//! Holds the entry point signature (used to label interactive prompts), the
//! function table, and a sequence-point map from code offsets back to source
//! lines. The layout contains no timestamps or absolute paths beyond the
//! source path given to the compiler, so rebuilding the same file produces
//! identical bytes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub avm: AvmInfo,
    pub compiler: CompilerInfo,
    pub files: Vec<SourceFile>,
    pub entry_point: FunctionSignature,
    pub functions: Vec<FunctionInfo>,
    pub map: Vec<SequencePoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvmInfo {
    /// Contract name (source file stem)
    pub name: String,
    /// Script hash of the `.avm` bytes
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub id: u32,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    pub params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub params: Vec<String>,
    pub start: usize,
    pub end: usize,
}

/// Code range `[start, end)` produced by the statement on `line`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencePoint {
    pub start: usize,
    pub end: usize,
    pub file: u32,
    pub line: usize,
}

impl DebugInfo {
    /// `<dir>/<stem>.debug.json` for a given `.avm` or source path.
    pub fn sidecar_path(path: &Path) -> PathBuf {
        path.with_extension("debug.json")
    }

    /// Pretty JSON with a trailing newline.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Load the sidecar for `avm_path` if one exists.
    ///
    /// A missing file is normal for hand-built bytecode; a malformed one is
    /// logged and ignored.
    pub fn load_sidecar(avm_path: &Path) -> Option<DebugInfo> {
        let path = Self::sidecar_path(avm_path);
        let data = std::fs::read(&path).ok()?;
        match serde_json::from_slice(&data) {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring malformed debug sidecar");
                None
            }
        }
    }

    /// Source line of the innermost sequence point covering `offset`.
    pub fn line_for_offset(&self, offset: usize) -> Option<usize> {
        self.map
            .iter()
            .filter(|p| p.start <= offset && offset < p.end)
            .min_by_key(|p| p.end - p.start)
            .map(|p| p.line)
    }

    /// Name of the function whose body contains `offset`.
    pub fn function_for_offset(&self, offset: usize) -> Option<&str> {
        self.functions
            .iter()
            .find(|f| f.start <= offset && offset < f.end)
            .map(|f| f.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DebugInfo {
        DebugInfo {
            avm: AvmInfo {
                name: "Sample".into(),
                hash: "0x00".into(),
            },
            compiler: CompilerInfo {
                name: "sc-sandbox".into(),
                version: "0.1.0".into(),
            },
            files: vec![SourceFile {
                id: 1,
                url: "Sample.py".into(),
            }],
            entry_point: FunctionSignature {
                name: "Main".into(),
                params: vec!["operation".into()],
            },
            functions: vec![FunctionInfo {
                name: "Main".into(),
                params: vec!["operation".into()],
                start: 0,
                end: 40,
            }],
            map: vec![
                SequencePoint {
                    start: 3,
                    end: 30,
                    file: 1,
                    line: 4,
                },
                SequencePoint {
                    start: 10,
                    end: 20,
                    file: 1,
                    line: 5,
                },
            ],
        }
    }

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            DebugInfo::sidecar_path(Path::new("dir/SampleSC.avm")),
            PathBuf::from("dir/SampleSC.debug.json")
        );
        assert_eq!(
            DebugInfo::sidecar_path(Path::new("dir/SampleSC.py")),
            PathBuf::from("dir/SampleSC.debug.json")
        );
    }

    #[test]
    fn test_line_lookup_prefers_innermost() {
        let info = sample();
        assert_eq!(info.line_for_offset(12), Some(5));
        assert_eq!(info.line_for_offset(25), Some(4));
        assert_eq!(info.line_for_offset(35), None);
        assert_eq!(info.function_for_offset(35), Some("Main"));
    }

    #[test]
    fn test_load_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let avm = dir.path().join("Sample.avm");
        assert!(DebugInfo::load_sidecar(&avm).is_none());

        let info = sample();
        std::fs::write(
            DebugInfo::sidecar_path(&avm),
            info.to_json_bytes().unwrap(),
        )
        .unwrap();
        assert_eq!(DebugInfo::load_sidecar(&avm), Some(info));

        std::fs::write(DebugInfo::sidecar_path(&avm), b"{not json").unwrap();
        assert!(DebugInfo::load_sidecar(&avm).is_none());
    }
}
