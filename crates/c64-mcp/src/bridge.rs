//! Tool invocation bridge
//!
//! Validates `tools/call` arguments, resolves the assembler settings and
//! runs the assemble operation.

use std::sync::Arc;

use async_trait::async_trait;
use c64_runner::{assemble_program, AssembleRequest, ProcessRunner};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::SettingsSource;
use crate::error::{ToolError, ValidationErrors};
use crate::server::ToolHandler;
use crate::tools::{ToolResult, ASSEMBLE_PROGRAM};

/// Caller-supplied arguments of `assemble_program`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleArgs {
    pub file_name: String,
    pub extra_args: Vec<String>,
}

impl AssembleArgs {
    /// Validate raw tool arguments, collecting every offending field.
    ///
    /// Optional fields may be omitted but not `null`. Unknown properties are
    /// ignored.
    pub fn parse(arguments: &Value) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let Value::Object(object) = arguments else {
            errors.push("arguments", "expected an object");
            return Err(errors);
        };

        let file_name = match object.get("fileName") {
            None => {
                errors.push("fileName", "required");
                None
            }
            Some(Value::String(s)) if s.is_empty() => {
                errors.push("fileName", "must not be empty");
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                errors.push("fileName", "expected string");
                None
            }
        };

        let mut extra_args = Vec::new();
        match object.get("extraArgs") {
            None => {}
            Some(Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    match item {
                        Value::String(s) => extra_args.push(s.clone()),
                        _ => errors.push(format!("extraArgs[{i}]"), "expected string"),
                    }
                }
            }
            Some(_) => errors.push("extraArgs", "expected array of strings"),
        }

        match file_name {
            Some(file_name) if errors.is_empty() => Ok(Self {
                file_name,
                extra_args,
            }),
            _ => Err(errors),
        }
    }
}

/// Serves `assemble_program` on top of a [`ProcessRunner`]
pub struct AssemblerBridge {
    runner: Arc<dyn ProcessRunner>,
    settings: SettingsSource,
}

impl AssemblerBridge {
    pub fn new(runner: Arc<dyn ProcessRunner>, settings: SettingsSource) -> Self {
        Self { runner, settings }
    }

    /// Bridge reading its settings from the process environment
    pub fn from_env(runner: Arc<dyn ProcessRunner>) -> Self {
        Self::new(runner, SettingsSource::Environment)
    }

    async fn assemble(&self, arguments: &Value) -> Result<ToolResult, ToolError> {
        let settings = self.settings.load()?;
        let args = AssembleArgs::parse(arguments)?;

        let request =
            AssembleRequest::new(settings.executable, settings.source_dir, args.file_name)?
                .with_extra_args(args.extra_args);

        info!(file = %request.file_name, "assemble_program");
        let result = assemble_program(self.runner.as_ref(), &request).await?;
        debug!(status = result.status, bytes = result.output.len(), "assemble_program finished");

        Ok(ToolResult::structured(&result))
    }
}

#[async_trait]
impl ToolHandler for AssemblerBridge {
    async fn call(&self, name: &str, arguments: Value) -> Result<ToolResult, ToolError> {
        match name {
            ASSEMBLE_PROGRAM => self.assemble(&arguments).await,
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}
