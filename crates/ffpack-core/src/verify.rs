//! Post-build smoke test.

use ffpack_schema::BuildArtifact;

use crate::error::PipelineError;
use crate::runner::{CommandRunner, Invocation};

/// Ask for the version only, with no banner and no non-error logging.
pub const VERIFY_ARGS: &[&str] = &["-version", "-hide_banner", "-loglevel", "error"];

/// Run `artifact` once and require a zero exit.
///
/// Output is discarded; only the exit status matters. The usual failure is
/// `SIGILL` from a slice compiled for a newer CPU than the host.
///
/// # Errors
///
/// Returns [`PipelineError::VerificationFailed`] on a non-zero exit or a
/// signal death.
pub fn verify<R: CommandRunner>(runner: &R, artifact: &BuildArtifact) -> Result<(), PipelineError> {
    let invocation = Invocation::new(artifact.path().to_string_lossy())
        .args(VERIFY_ARGS.iter().copied())
        .discard_output();

    tracing::info!(binary = %artifact.path().display(), "verifying");
    let outcome = runner.run(&invocation)?;
    if !outcome.success() {
        return Err(PipelineError::VerificationFailed {
            path: artifact.path().to_path_buf(),
            outcome,
        });
    }
    Ok(())
}
