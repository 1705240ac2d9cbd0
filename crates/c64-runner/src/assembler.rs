//! Assemble operation
//!
//! Turns an [`AssembleRequest`] into the assembler command line and hands it
//! to a [`ProcessRunner`].

use crate::runner::ProcessRunner;
use crate::types::*;
use tracing::debug;

/// Assemble `request.file_name` into `<base>.prg` and `<base>.map`.
///
/// The source file is not checked for existence; a missing file shows up as
/// the assembler's own non-zero exit. Results and errors from the runner are
/// returned unchanged.
pub async fn assemble_program<R>(
    runner: &R,
    request: &AssembleRequest,
) -> Result<AssemblerResult, RunnerError>
where
    R: ProcessRunner + ?Sized,
{
    let args = request.args();
    debug!(
        file = %request.file_name,
        output = %request.output_path(),
        "Assembling program"
    );
    runner.run(&request.executable, &args).await
}
