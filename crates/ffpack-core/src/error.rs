//! Pipeline errors and their process exit codes.

use std::path::PathBuf;

use ffpack_schema::Arch;
use thiserror::Error;

use crate::builder::BuildStep;
use crate::io::download::FetchError;
use crate::runner::{Outcome, RunError};

/// How to list the code-signing identities installed in the keychain.
pub const IDENTITY_DISCOVERY_HINT: &str = "security find-identity -v -p codesigning";

/// Failure merging per-architecture binaries.
#[derive(Error, Debug)]
pub enum MergeError {
    /// A per-architecture binary is not where the builder should have left it.
    #[error("{slice} binary missing at {}", path.display())]
    MissingInput {
        /// Label of the missing slice (`arm64`, `x86_64`).
        slice: String,
        /// Expected location.
        path: PathBuf,
    },

    /// `lipo` ran and failed.
    #[error("lipo failed ({outcome})")]
    Tool {
        /// How `lipo` exited.
        outcome: Outcome,
    },
}

/// Every way a run can abort. All of them are fatal; there are no retries.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Downloading or extracting the source archive failed.
    #[error("Failed to fetch FFmpeg sources")]
    Fetch(#[from] FetchError),

    /// Configure, make or install failed for one architecture.
    #[error("Build failed for {arch}: {step} ({outcome})")]
    Build {
        /// Architecture being built.
        arch: Arch,
        /// Step that failed.
        step: BuildStep,
        /// How the tool exited.
        outcome: Outcome,
    },

    /// Install succeeded but left no binary behind.
    #[error("Build failed for {arch}: install produced no binary at {}", path.display())]
    MissingBuildOutput {
        /// Architecture being built.
        arch: Arch,
        /// Expected binary location.
        path: PathBuf,
    },

    /// Creating the universal binary failed.
    #[error("Failed to create universal binary")]
    Merge(#[from] MergeError),

    /// Signing was requested without an identity.
    #[error(
        "Code signing requested but no signing identity was provided.\n  \
         Pass --identity \"Developer ID Application: ...\" or set IDENTITY.\n  \
         List available identities with: {hint}",
        hint = IDENTITY_DISCOVERY_HINT
    )]
    MissingSigningIdentity,

    /// `codesign` failed.
    #[error("codesign failed on {} ({outcome})", path.display())]
    Sign {
        /// Binary being signed.
        path: PathBuf,
        /// How `codesign` exited.
        outcome: Outcome,
    },

    /// Copying the binary into the resource directory failed.
    #[error("Failed to publish {}", path.display())]
    Publish {
        /// Destination that could not be written.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The built binary did not run.
    #[error(
        "Verification failed: {} did not run ({outcome}). \
         The binary likely contains instructions this CPU cannot execute; \
         rebuild without --enable-asm or for the host architecture",
        path.display()
    )]
    VerificationFailed {
        /// Binary that was executed.
        path: PathBuf,
        /// How it exited.
        outcome: Outcome,
    },

    /// A tool could not be started at all.
    #[error(transparent)]
    Run(#[from] RunError),

    /// Filesystem bookkeeping failed.
    #[error("IO error")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Process exit code for this failure. Argument errors (2) come from clap
    /// before a pipeline exists.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Fetch(_) => 3,
            Self::Build { .. } | Self::MissingBuildOutput { .. } => 4,
            Self::Merge(_) => 5,
            Self::MissingSigningIdentity => 6,
            Self::Sign { .. } => 7,
            Self::Publish { .. } => 8,
            Self::VerificationFailed { .. } => 9,
            Self::Run(_) | Self::Io(_) => 1,
        }
    }
}
