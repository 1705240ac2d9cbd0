//! launch-vice - start the VICE emulator
//!
//! Reads `VICE_PATH` from the environment or `.env` and starts it detached.

use std::process::{Command, Stdio};

use anyhow::{Context, Result};

const VICE_PATH_ENV: &str = "VICE_PATH";

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let vice = std::env::var(VICE_PATH_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .with_context(|| format!("{} environment variable not set", VICE_PATH_ENV))?;
    println!("{}", vice);

    let child = Command::new(&vice)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to launch VICE: {}", vice))?;
    println!("VICE started (pid {})", child.id());
    Ok(())
}
