//! c64-runner - assembler process wrapper
//!
//! Builds the assembler invocation for a source file and runs it as a child
//! process, capturing stdout/stderr until both streams close and the process
//! exits.
//!
//! # Example
//!
//! ```no_run
//! use c64_runner::{assemble_program, AssembleRequest, CommandRunner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), c64_runner::RunnerError> {
//!     let runner = CommandRunner::new();
//!
//!     let request = AssembleRequest::new("/usr/bin/acme", "/home/me/c64", "hello.asm")?
//!         .with_extra_args(vec!["-v".to_string()]);
//!
//!     let result = assemble_program(&runner, &request).await?;
//!     println!("status {}: {}", result.status, result.output);
//!     Ok(())
//! }
//! ```

mod assembler;
mod runner;
mod types;

pub use assembler::assemble_program;
pub use runner::{CommandRunner, ProcessRunner};
pub use types::*;
