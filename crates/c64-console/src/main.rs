//! c64-console - interactive console for the mcp-c64 server
//!
//! Launches the server over stdio and lets you poke at it by hand.
//!
//! Usage:
//!   c64-console
//!   c64-console --server ./target/debug/mcp-c64
//!   c64-console --server node -- dist/index.js

mod client;

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};

use client::McpClient;

const DEFAULT_SERVER: &str = "mcp-c64";

#[derive(Parser, Debug)]
#[command(name = "c64-console")]
#[command(about = "Interactive console for the mcp-c64 MCP server")]
#[command(version)]
struct Args {
    /// Server executable to launch
    #[arg(short, long, default_value = DEFAULT_SERVER)]
    server: String,

    /// Give up on a request after this many seconds (default: wait)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Arguments passed to the server
    #[arg(last = true)]
    server_args: Vec<String>,
}

/// A parsed console line
#[derive(Debug, Clone, PartialEq)]
enum ConsoleCommand {
    Help,
    ListTools,
    CallTool { name: String, args: ToolArgs },
    ListPrompts,
    GetPrompt { name: String, args: ToolArgs },
    ListResources,
    Quit,
    Usage(&'static str),
    Unknown(String),
    Empty,
}

/// JSON arguments typed after a tool or prompt name
#[derive(Debug, Clone, PartialEq)]
enum ToolArgs {
    Parsed(Value),
    /// Not valid JSON; the call goes out with empty arguments
    Invalid,
}

impl ToolArgs {
    fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return ToolArgs::Parsed(json!({}));
        }
        serde_json::from_str(raw)
            .map(ToolArgs::Parsed)
            .unwrap_or(ToolArgs::Invalid)
    }

    fn into_value(self) -> Value {
        match self {
            ToolArgs::Parsed(value) => value,
            ToolArgs::Invalid => {
                println!("Invalid JSON arguments. Using empty args.");
                json!({})
            }
        }
    }
}

/// Split off the first whitespace-delimited word.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim()),
        None => (s, ""),
    }
}

fn parse_command(line: &str) -> ConsoleCommand {
    let (command, rest) = split_word(line.trim());

    match command.to_lowercase().as_str() {
        "" => ConsoleCommand::Empty,
        "help" => ConsoleCommand::Help,
        "list-tools" => ConsoleCommand::ListTools,
        "call-tool" => {
            let (name, args) = split_word(rest);
            if name.is_empty() {
                ConsoleCommand::Usage("Usage: call-tool <name> [args]")
            } else {
                ConsoleCommand::CallTool {
                    name: name.to_string(),
                    args: ToolArgs::parse(args),
                }
            }
        }
        "list-prompts" => ConsoleCommand::ListPrompts,
        "get-prompt" => {
            let (name, args) = split_word(rest);
            if name.is_empty() {
                ConsoleCommand::Usage("Usage: get-prompt <name> [args]")
            } else {
                ConsoleCommand::GetPrompt {
                    name: name.to_string(),
                    args: ToolArgs::parse(args),
                }
            }
        }
        "list-resources" => ConsoleCommand::ListResources,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => ConsoleCommand::Unknown(other.to_string()),
    }
}

fn print_help() {
    println!("\nAvailable commands:");
    println!("  help                       - Show this help");
    println!("  list-tools                 - List available tools");
    println!("  call-tool <name> [args]    - Call a tool with optional JSON arguments");
    println!("  list-prompts               - List available prompts");
    println!("  get-prompt <name> [args]   - Get a prompt with optional JSON arguments");
    println!("  list-resources             - List available resources");
    println!("  quit                       - Exit the program");
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Run one command. Returns `false` when the console should exit.
async fn execute(client: &McpClient, command: ConsoleCommand) -> bool {
    match command {
        ConsoleCommand::Empty => {}
        ConsoleCommand::Help => print_help(),
        ConsoleCommand::Quit => return false,
        ConsoleCommand::Usage(usage) => println!("{}", usage),
        ConsoleCommand::Unknown(other) => println!("Unknown command: {}", other),
        ConsoleCommand::ListTools => match client.list_tools().await {
            Ok(tools) => {
                println!("Available tools:");
                if tools.is_empty() {
                    println!("  No tools available");
                }
                for tool in tools {
                    println!("  - {}: {}", tool.name, tool.description);
                }
            }
            Err(e) => println!("Tools not supported by this server ({})", e),
        },
        ConsoleCommand::CallTool { name, args } => {
            let args = args.into_value();
            println!("Calling tool '{}' with args: {}", name, args);
            match client.call_tool(&name, args).await {
                Ok(result) => {
                    println!("Tool result:");
                    match result.structured_content {
                        Some(structured) => println!("{}", pretty(&structured)),
                        None => println!("{}", result.text_content()),
                    }
                }
                Err(e) => println!("Error calling tool {}: {}", name, e),
            }
        }
        ConsoleCommand::ListPrompts => match client.list_prompts().await {
            Ok(result) => {
                println!("Available prompts:");
                list_named(&result, "prompts", "description");
            }
            Err(e) => println!("Prompts not supported by this server ({})", e),
        },
        ConsoleCommand::GetPrompt { name, args } => {
            match client.get_prompt(&name, args.into_value()).await {
                Ok(result) => {
                    println!("Prompt template:");
                    let messages = result["messages"].as_array().cloned().unwrap_or_default();
                    for (i, msg) in messages.iter().enumerate() {
                        println!(
                            "  [{}] {}: {}",
                            i + 1,
                            msg["role"].as_str().unwrap_or("?"),
                            msg["content"]["text"].as_str().unwrap_or("")
                        );
                    }
                }
                Err(e) => println!("Error getting prompt {}: {}", name, e),
            }
        }
        ConsoleCommand::ListResources => match client.list_resources().await {
            Ok(result) => {
                println!("Available resources:");
                list_named(&result, "resources", "uri");
            }
            Err(e) => println!("Resources not supported by this server ({})", e),
        },
    }
    true
}

/// Print `name: <detail>` for each entry of `result[key]`.
fn list_named(result: &Value, key: &str, detail: &str) {
    let entries = result[key].as_array().cloned().unwrap_or_default();
    if entries.is_empty() {
        println!("  No {} available", key);
    }
    for entry in entries {
        println!(
            "  - {}: {}",
            entry["name"].as_str().unwrap_or("?"),
            entry[detail].as_str().unwrap_or("")
        );
    }
}

fn prompt() {
    print!("\n> ");
    let _ = std::io::stdout().flush();
}

async fn command_loop(client: &McpClient) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt();
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!("\nReceived SIGINT. Cleaning up...");
                return Ok(());
            }
        };

        let Some(line) = line else {
            return Ok(());
        };

        if !execute(client, parse_command(&line)).await {
            return Ok(());
        }

        if !client.is_alive() {
            println!("Server exited.");
            return Ok(());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Same .env as the server, so ASSEMBLER / SRC_PATH reach the child
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    println!("MCP Interactive Client");
    println!("=====================");
    println!("STDIO transport: command={}", args.server);

    let client = match McpClient::spawn(&args.server, &args.server_args).await {
        Ok(client) => client.with_request_timeout(args.timeout.map(Duration::from_secs)),
        Err(e) => {
            eprintln!("Error from MCP server: {:#}", e);
            std::process::exit(1);
        }
    };
    println!(
        "Connected to {} server",
        client.server_info()["name"].as_str().unwrap_or("MCP")
    );

    print_help();
    command_loop(&client).await?;

    println!("\nGoodbye!");
    Ok(())
}
