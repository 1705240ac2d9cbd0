//! MCP (Model Context Protocol) server for a C64 assembler
//!
//! Exposes a single tool, `assemble_program`, over line-delimited JSON-RPC
//! 2.0 on stdio. A tool call runs the configured assembler on a file in the
//! configured source directory and returns its exit status and output.
//!
//! # Features
//!
//! - Self-contained JSON-RPC 2.0 protocol implementation
//! - Async stdio transport using tokio, one task per request
//! - Settings from `ASSEMBLER` / `SRC_PATH`, re-read on every call
//! - Uniform `Error processing request: ...` failures tagged with an error kind
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use c64_mcp::{AssemblerBridge, McpServer};
//! use c64_runner::CommandRunner;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bridge = AssemblerBridge::from_env(Arc::new(CommandRunner::new()));
//!     let server = McpServer::new(bridge);
//!     server.run().await
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod tools;

// Re-exports for convenience
pub use bridge::{AssembleArgs, AssemblerBridge};
pub use config::{AssemblerSettings, RawSettings, SettingsSource};
pub use error::{FieldError, ToolError, ValidationErrors};
pub use protocol::{Request, RequestId, Response, RpcError};
pub use server::{McpServer, ToolHandler};
pub use tools::{all_tools, get_tool, ToolContent, ToolDefinition, ToolResult};
