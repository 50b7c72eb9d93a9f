//! Code signing with `codesign`.
//!
//! Signs with the hardened runtime and a secure timestamp, both required for
//! notarization. The signature is written into the binary in place; the file
//! mode is untouched.

use ffpack_schema::BuildArtifact;

use crate::error::PipelineError;
use crate::paths::Layout;
use crate::runner::{CommandRunner, Invocation};

/// Arguments for `codesign` (excluding the binary path).
pub fn codesign_args(identity: &str) -> Vec<String> {
    vec![
        "--force".to_string(),
        "--options".to_string(),
        "runtime".to_string(),
        "--timestamp".to_string(),
        "--sign".to_string(),
        identity.to_string(),
    ]
}

/// Sign `artifact` with `identity`.
///
/// The identity check happens here, not at argument parsing: an unsigned
/// build can still be useful for local testing, so only the signing step
/// insists on it.
///
/// # Errors
///
/// Returns [`PipelineError::MissingSigningIdentity`] when `identity` is
/// `None` (without running `codesign`), and [`PipelineError::Sign`] when
/// `codesign` exits non-zero.
pub fn sign<R: CommandRunner>(
    runner: &R,
    layout: &Layout,
    artifact: &BuildArtifact,
    identity: Option<&str>,
) -> Result<(), PipelineError> {
    let identity = identity.ok_or(PipelineError::MissingSigningIdentity)?;

    let invocation = Invocation::new("codesign")
        .args(codesign_args(identity))
        .path_arg(artifact.path())
        .logged(layout.log_path("codesign", None));

    tracing::info!(binary = %artifact.path().display(), %identity, "signing");
    let outcome = runner.run(&invocation)?;
    if !outcome.success() {
        return Err(PipelineError::Sign {
            path: artifact.path().to_path_buf(),
            outcome,
        });
    }
    Ok(())
}
