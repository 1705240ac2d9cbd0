//! Tool call errors
//!
//! Everything that can go wrong while serving `tools/call`. The server turns
//! these into a single JSON-RPC error at the protocol boundary.

use c64_runner::RunnerError;
use std::fmt;

use crate::protocol::RpcError;

/// Prefix of every tool failure message sent to the caller
pub const TOOL_FAILURE_PREFIX: &str = "Error processing request";

/// A single invalid argument field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field path, e.g. `fileName` or `extraArgs[2]`
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// All offending fields of one tool call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors {
    pub fields: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field paths in the order they were reported
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.field.as_str()).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Tool call errors
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    Validation(ValidationErrors),

    #[error("{0}")]
    Configuration(String),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

impl From<ValidationErrors> for ToolError {
    fn from(errors: ValidationErrors) -> Self {
        ToolError::Validation(errors)
    }
}

impl ToolError {
    /// Stable tag for the error category, sent as `error.data.kind`
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::Validation(_) => "validation",
            ToolError::Configuration(_) => "configuration",
            ToolError::Runner(RunnerError::InvalidRequest(_)) => "validation",
            ToolError::Runner(RunnerError::Spawn { .. }) => "spawn",
            ToolError::Runner(RunnerError::Timeout(_)) => "timeout",
            ToolError::Runner(RunnerError::Io(_)) => "io",
            ToolError::UnknownTool(_) => "unknown_tool",
        }
    }

    /// Wrap into the uniform failure sent across the protocol boundary.
    pub fn into_rpc_error(self) -> RpcError {
        RpcError::ToolFailed {
            message: format!("{}: {}", TOOL_FAILURE_PREFIX, self),
            kind: self.kind(),
        }
    }
}
