//! Shared types for ffpack.
//!
//! Kept free of IO so both the core pipeline and the CLI can depend on it.

pub mod arch;
pub mod artifact;
pub mod version;

// Re-exports
pub use arch::*;
pub use artifact::BuildArtifact;
pub use version::{MinOsVersion, VersionError};

/// FFmpeg release that ffpack downloads and builds.
pub const FFMPEG_VERSION: &str = "7.1.1";

/// Name of the FFmpeg executable inside every install prefix.
pub const FFMPEG_BINARY: &str = "ffmpeg";
