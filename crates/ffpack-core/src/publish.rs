//! Copy the final binary and FFmpeg's license into the app resources.

use std::path::{Path, PathBuf};

use ffpack_schema::BuildArtifact;

use crate::Reporter;
use crate::error::PipelineError;
use crate::paths::Layout;

/// Where things ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// The published executable.
    pub binary: BuildArtifact,
    /// The published license, if the source tree had one.
    pub license: Option<PathBuf>,
}

/// Copy `artifact` to `resources/bin/ffmpeg` (mode 0755) and the license next
/// to it.
///
/// A missing license is reported as a warning and does not fail the run.
///
/// # Errors
///
/// Returns [`PipelineError::Publish`] if the resource directory cannot be
/// created or the binary cannot be copied or made executable.
pub fn publish<R: Reporter + ?Sized>(
    layout: &Layout,
    artifact: &BuildArtifact,
    reporter: &R,
) -> Result<Published, PipelineError> {
    let resources = layout.resources_dir();
    std::fs::create_dir_all(&resources).map_err(|source| PipelineError::Publish {
        path: resources.clone(),
        source,
    })?;

    let dest = layout.published_binary();
    copy_executable(artifact.path(), &dest).map_err(|source| PipelineError::Publish {
        path: dest.clone(),
        source,
    })?;
    tracing::info!(dest = %dest.display(), "published binary");

    let license_src = layout.license_source();
    let license = if license_src.is_file() {
        let license_dest = layout.published_license();
        std::fs::copy(&license_src, &license_dest).map_err(|source| PipelineError::Publish {
            path: license_dest.clone(),
            source,
        })?;
        Some(license_dest)
    } else {
        tracing::warn!(path = %license_src.display(), "license file not found");
        reporter.warning(&format!(
            "License file not found at {}; publishing without it",
            license_src.display()
        ));
        None
    };

    Ok(Published {
        binary: artifact.relocated(dest),
        license,
    })
}

fn copy_executable(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::fs::copy(src, dest)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dest, std::fs::Permissions::from_mode(0o755))?;
    }

    Ok(())
}
