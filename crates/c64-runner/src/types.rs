//! Request/result types for assembler invocations

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Extension of the binary load image written next to the source.
pub const PROGRAM_EXTENSION: &str = "prg";
/// Extension of the symbol/address map written next to the source.
pub const MAP_EXTENSION: &str = "map";

/// A single assembler invocation.
///
/// Built per tool call and consumed once. The derived paths are recomputed
/// on every access and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleRequest {
    /// Assembler executable (path or command name on `PATH`)
    pub executable: String,
    /// Directory holding the source file
    pub source_dir: String,
    /// Source file name, relative to `source_dir`
    pub file_name: String,
    /// Flags appended verbatim after the generated arguments
    pub extra_args: Vec<String>,
}

impl AssembleRequest {
    /// Create a request with no extra arguments.
    ///
    /// Fails when `executable` or `file_name` is empty.
    pub fn new(
        executable: impl Into<String>,
        source_dir: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Result<Self, RunnerError> {
        let executable = executable.into();
        let file_name = file_name.into();

        if executable.is_empty() {
            return Err(RunnerError::InvalidRequest("executable must not be empty"));
        }
        if file_name.is_empty() {
            return Err(RunnerError::InvalidRequest("file name must not be empty"));
        }

        Ok(Self {
            executable,
            source_dir: source_dir.into(),
            file_name,
            extra_args: Vec::new(),
        })
    }

    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    /// File name with its final extension stripped.
    pub fn base_name(&self) -> &str {
        strip_extension(&self.file_name)
    }

    pub fn source_path(&self) -> String {
        self.join(&self.file_name)
    }

    pub fn output_path(&self) -> String {
        self.join(&format!("{}.{}", self.base_name(), PROGRAM_EXTENSION))
    }

    pub fn map_path(&self) -> String {
        self.join(&format!("{}.{}", self.base_name(), MAP_EXTENSION))
    }

    /// Argument list handed to the assembler:
    /// `[source, "-o", output, "--map", map, ...extra_args]`
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            self.source_path(),
            "-o".to_string(),
            self.output_path(),
            "--map".to_string(),
            self.map_path(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    fn join(&self, name: &str) -> String {
        format!("{}/{}", self.source_dir.trim_end_matches('/'), name)
    }
}

/// Strip a trailing `.ext`, where `ext` is non-empty and holds no `/` or `.`.
fn strip_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(dot) => {
            let ext = &file_name[dot + 1..];
            if ext.is_empty() || ext.contains('/') {
                file_name
            } else {
                &file_name[..dot]
            }
        }
        None => file_name,
    }
}

/// Outcome of a finished assembler process.
///
/// `output` is the captured stdout when `status == 0`, otherwise the
/// captured stderr. The two streams are never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblerResult {
    pub output: String,
    pub status: i32,
}

impl AssemblerResult {
    /// Select the reported stream from the exit status.
    pub fn from_streams(status: i32, stdout: String, stderr: String) -> Self {
        let output = if status == 0 { stdout } else { stderr };
        Self { output, status }
    }

    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// Runner errors
///
/// A non-zero exit status is not an error; it is reported through
/// [`AssemblerResult::status`].
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Invalid assemble request: {0}")]
    InvalidRequest(&'static str),

    #[error("Failed to spawn {executable}: {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Assembler timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(file_name: &str) -> AssembleRequest {
        AssembleRequest::new("/usr/bin/asm", "/proj", file_name).unwrap()
    }

    #[test]
    fn test_invocation_args() {
        let req = request("hello.asm").with_extra_args(vec!["-v".to_string()]);
        assert_eq!(
            req.args(),
            vec![
                "/proj/hello.asm",
                "-o",
                "/proj/hello.prg",
                "--map",
                "/proj/hello.map",
                "-v",
            ]
        );
    }

    #[test]
    fn test_extra_args_keep_order() {
        let req = request("demo.s").with_extra_args(vec![
            "--cpu".to_string(),
            "6510".to_string(),
            "-Dfoo=1 2".to_string(),
        ]);
        let args = req.args();
        assert_eq!(&args[5..], &["--cpu", "6510", "-Dfoo=1 2"]);
    }

    #[test]
    fn test_base_name() {
        assert_eq!(request("hello.asm").base_name(), "hello");
        assert_eq!(request("a.b.asm").base_name(), "a.b");
        assert_eq!(request("noext").base_name(), "noext");
        assert_eq!(request("file.").base_name(), "file.");
        assert_eq!(request("sub/prog.s").base_name(), "sub/prog");
        assert_eq!(request("dir.v2/file").base_name(), "dir.v2/file");
    }

    #[test]
    fn test_single_separator() {
        let req = AssembleRequest::new("asm", "/proj/", "hello.asm").unwrap();
        assert_eq!(req.source_path(), "/proj/hello.asm");
        assert_eq!(req.output_path(), "/proj/hello.prg");
        assert_eq!(req.map_path(), "/proj/hello.map");

        let root = AssembleRequest::new("asm", "/", "hello.asm").unwrap();
        assert_eq!(root.source_path(), "/hello.asm");
    }

    #[test]
    fn test_without_extension() {
        let req = request("boot");
        assert_eq!(req.output_path(), "/proj/boot.prg");
        assert_eq!(req.map_path(), "/proj/boot.map");
    }

    #[test]
    fn test_rejects_empty_fields() {
        assert!(matches!(
            AssembleRequest::new("", "/proj", "hello.asm"),
            Err(RunnerError::InvalidRequest(_))
        ));
        assert!(matches!(
            AssembleRequest::new("asm", "/proj", ""),
            Err(RunnerError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_result_stream_selection() {
        let ok = AssemblerResult::from_streams(0, "OK\n".into(), "warning\n".into());
        assert_eq!(ok.output, "OK\n");
        assert!(ok.is_success());

        let failed =
            AssemblerResult::from_streams(1, "partial\n".into(), "syntax error line 3\n".into());
        assert_eq!(failed.output, "syntax error line 3\n");
        assert_eq!(failed.status, 1);
    }

    #[test]
    fn test_result_serialization() {
        let result = AssemblerResult { output: "OK\n".into(), status: 0 };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, serde_json::json!({ "output": "OK\n", "status": 0 }));
    }
}
