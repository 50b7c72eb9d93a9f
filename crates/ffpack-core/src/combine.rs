//! Universal binary creation for macOS (Intel + Apple Silicon)
//!
//! Merges the per-architecture `ffmpeg` executables with Apple's `lipo`.
//! Only used when both architectures were built; a single-architecture run
//! publishes its one binary as-is.

use ffpack_schema::BuildArtifact;

use crate::error::{MergeError, PipelineError};
use crate::paths::Layout;
use crate::runner::{CommandRunner, Invocation};

/// Merge `inputs` into `build/out/universal/ffmpeg`.
///
/// Every input must exist before `lipo` is started.
///
/// # Errors
///
/// Returns [`MergeError::MissingInput`] if any input binary is absent and
/// [`MergeError::Tool`] if `lipo` exits non-zero.
pub fn merge<R: CommandRunner>(
    runner: &R,
    layout: &Layout,
    inputs: &[BuildArtifact],
) -> Result<BuildArtifact, PipelineError> {
    for input in inputs {
        if !input.path().is_file() {
            return Err(MergeError::MissingInput {
                slice: input.label(),
                path: input.path().to_path_buf(),
            }
            .into());
        }
    }

    let output = layout.universal_binary();
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Command: lipo -create <arm64> <x86_64> -output <universal>
    let invocation = inputs
        .iter()
        .fold(Invocation::new("lipo").arg("-create"), |inv, input| {
            inv.path_arg(input.path())
        })
        .arg("-output")
        .path_arg(&output)
        .logged(layout.log_path("lipo", None));

    tracing::info!(output = %output.display(), slices = inputs.len(), "creating universal binary");
    let outcome = runner.run(&invocation)?;
    if !outcome.success() {
        return Err(MergeError::Tool { outcome }.into());
    }

    Ok(BuildArtifact::universal(output))
}
