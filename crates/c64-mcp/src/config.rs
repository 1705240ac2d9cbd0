//! Assembler settings
//!
//! The assembler executable and source directory come from the process
//! environment (optionally seeded from `.env`) and are re-read for every
//! tool call.

use std::time::Duration;

use crate::error::ToolError;

/// Assembler executable
pub const ASSEMBLER_ENV: &str = "ASSEMBLER";
/// Directory holding the sources
pub const SRC_PATH_ENV: &str = "SRC_PATH";
/// Optional assembler timeout in seconds
pub const TIMEOUT_ENV: &str = "ASSEMBLER_TIMEOUT_SECS";

/// Settings required to run the assembler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblerSettings {
    pub executable: String,
    pub source_dir: String,
}

/// Settings as found, before checking that the required ones are present
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSettings {
    pub assembler: Option<String>,
    pub source_dir: Option<String>,
}

impl RawSettings {
    pub fn new(assembler: impl Into<String>, source_dir: impl Into<String>) -> Self {
        Self {
            assembler: Some(assembler.into()),
            source_dir: Some(source_dir.into()),
        }
    }

    pub fn from_env() -> Self {
        Self {
            assembler: std::env::var(ASSEMBLER_ENV).ok(),
            source_dir: std::env::var(SRC_PATH_ENV).ok(),
        }
    }

    /// Check that both settings are present and non-empty.
    pub fn resolve(self) -> Result<AssemblerSettings, ToolError> {
        let executable = non_empty(self.assembler).ok_or_else(|| not_set(ASSEMBLER_ENV))?;
        let source_dir = non_empty(self.source_dir).ok_or_else(|| not_set(SRC_PATH_ENV))?;

        Ok(AssemblerSettings {
            executable,
            source_dir,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn not_set(var: &str) -> ToolError {
    ToolError::Configuration(format!("{var} environment variable not set"))
}

/// Where the bridge reads its settings from on each call
#[derive(Debug, Clone)]
pub enum SettingsSource {
    /// Read `ASSEMBLER` / `SRC_PATH` from the process environment
    Environment,
    /// Fixed values (embedding, tests)
    Fixed(RawSettings),
}

impl SettingsSource {
    pub fn load(&self) -> Result<AssemblerSettings, ToolError> {
        match self {
            SettingsSource::Environment => RawSettings::from_env().resolve(),
            SettingsSource::Fixed(raw) => raw.clone().resolve(),
        }
    }
}

/// Parse the optional `ASSEMBLER_TIMEOUT_SECS` value.
///
/// Unset or empty means no timeout; anything else must be a positive
/// integer.
pub fn parse_timeout(value: Option<&str>) -> anyhow::Result<Option<Duration>> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
        _ => anyhow::bail!("{TIMEOUT_ENV} must be a positive number of seconds, got '{raw}'"),
    }
}

/// Read the assembler timeout from the environment
pub fn timeout_from_env() -> anyhow::Result<Option<Duration>> {
    parse_timeout(std::env::var(TIMEOUT_ENV).ok().as_deref())
}
