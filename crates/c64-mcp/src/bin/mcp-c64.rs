//! mcp-c64 - MCP stdio server for the C64 assembler
//!
//! Launched by an MCP client (e.g. an AI assistant). Reads `ASSEMBLER` and
//! `SRC_PATH` from the environment or a `.env` file in the working
//! directory.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use c64_mcp::config;
use c64_mcp::{AssemblerBridge, McpServer};
use c64_runner::CommandRunner;

fn log_filter() -> tracing_subscriber::EnvFilter {
    let level = if let Ok(v) = std::env::var("RUST_LOG") {
        v
    } else if let Ok(v) = std::env::var("MCP_C64_LOG_LEVEL") {
        match v.as_str() {
            "silent" => "off".to_string(),
            "fatal" => "error".to_string(),
            other => other.to_string(),
        }
    } else {
        "info".to_string()
    };

    tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;
    let name = tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sighup.recv() => "SIGHUP",
    };
    Ok(name)
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine; the variables may come from the client config
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .init();

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    let runner = match config::timeout_from_env()? {
        Some(timeout) => {
            info!(?timeout, "Assembler timeout enabled");
            CommandRunner::with_timeout(timeout)
        }
        None => CommandRunner::new(),
    };

    let server = McpServer::new(AssemblerBridge::from_env(Arc::new(runner)));
    info!("mcp-c64 MCP Server running on stdio");

    tokio::select! {
        result = server.run() => result?,
        signal = shutdown_signal() => {
            let signal = signal?;
            warn!(%signal, "Shutting down");
        }
    }

    Ok(())
}
