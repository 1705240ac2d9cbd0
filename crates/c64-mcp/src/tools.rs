//! MCP Tool definitions
//!
//! This module defines the advertised tools, their input schemas, and the
//! result payload returned from `tools/call`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Name of the assembler tool
pub const ASSEMBLE_PROGRAM: &str = "assemble_program";

/// Tool definition following MCP schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Tool name (e.g., "assemble_program")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema for input parameters
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        ToolDefinition {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Tool result content type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
}

/// Tool call result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    /// Machine-readable copy of the result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolResult {
    /// Create a result carrying `value` both as structured content and as
    /// pretty-printed JSON text.
    pub fn structured<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(structured) => {
                let text = serde_json::to_string_pretty(value)
                    .unwrap_or_else(|_| structured.to_string());
                ToolResult {
                    content: vec![ToolContent::Text { text }],
                    structured_content: Some(structured),
                    is_error: None,
                }
            }
            Err(e) => ToolResult::error(e.to_string()),
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        ToolResult {
            content: vec![ToolContent::Text {
                text: json!({ "error": message.into() }).to_string(),
            }],
            structured_content: None,
            is_error: Some(true),
        }
    }

    /// Concatenated text of all content blocks
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                ToolContent::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Generate all tool definitions
pub fn all_tools() -> Vec<ToolDefinition> {
    vec![ToolDefinition::new(
        ASSEMBLE_PROGRAM,
        "Assemble a program. Runs the configured assembler on a source file in the \
         source directory, writing <name>.prg and <name>.map next to it. Returns the \
         assembler's exit status and its output (stdout on success, stderr on failure).",
        json!({
            "type": "object",
            "properties": {
                "fileName": {
                    "type": "string",
                    "minLength": 1,
                    "description":
                        "Source file name relative to the source directory (e.g. hello.asm)"
                },
                "extraArgs": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description":
                        "Additional assembler flags, appended after the generated arguments"
                }
            },
            "required": ["fileName"]
        }),
    )]
}

/// Get tool by name
pub fn get_tool(name: &str) -> Option<ToolDefinition> {
    all_tools().into_iter().find(|t| t.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_tools() {
        let tools = all_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, ASSEMBLE_PROGRAM);
        assert_eq!(tools[0].input_schema["required"], json!(["fileName"]));
        assert_eq!(
            tools[0].input_schema["properties"]["extraArgs"]["items"]["type"],
            "string"
        );
    }

    #[test]
    fn test_definition_serializes_camel_case() {
        let value = serde_json::to_value(&all_tools()[0]).unwrap();
        assert!(value.get("inputSchema").is_some());
        assert!(value.get("input_schema").is_none());
    }

    #[test]
    fn test_get_tool() {
        assert!(get_tool("assemble_program").is_some());
        assert!(get_tool("foo_bar").is_none());
    }

    #[test]
    fn test_tool_result_structured() {
        let result = ToolResult::structured(&json!({ "output": "OK\n", "status": 0 }));
        assert_eq!(
            result.structured_content,
            Some(json!({ "output": "OK\n", "status": 0 }))
        );

        let text = result.text_content();
        assert!(text.contains('\n'), "text rendering should be pretty-printed");
        let reparsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(reparsed, json!({ "output": "OK\n", "status": 0 }));

        let wire = serde_json::to_value(&result).unwrap();
        assert!(wire.get("structuredContent").is_some());
        assert!(wire.get("isError").is_none());
        assert_eq!(wire["content"][0]["type"], "text");
    }

    #[test]
    fn test_tool_result_error() {
        let result = ToolResult::error("Something went wrong");
        assert_eq!(result.is_error, Some(true));
        assert!(result.structured_content.is_none());
    }
}
