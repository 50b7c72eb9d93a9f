//! Target CPU architectures.
//!
//! ffpack builds FFmpeg for both Apple Silicon (ARM64) and Intel (`x86_64`)
//! Macs. Each architecture gets its own configure/make/install pass and its
//! own install prefix; the two results are later merged with `lipo`.
//!
//! # Example
//!
//! ```
//! use ffpack_schema::Arch;
//!
//! let arch: Arch = "arm64".parse().unwrap();
//! assert_eq!(arch.ffmpeg_name(), "aarch64");
//! ```

use thiserror::Error;

/// Error returned when an architecture tag is not one of the supported two.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchError {
    /// The tag is neither `arm64` nor `x86_64`.
    #[error("invalid architecture '{0}' (expected 'arm64' or 'x86_64')")]
    InvalidArchitecture(String),
}

/// A build target architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arch {
    /// ARM64 architecture (Apple Silicon: M1, M2, M3, etc.)
    Arm64,
    /// `x86_64` architecture (Intel Macs)
    X86_64,
}

impl Arch {
    /// Every supported architecture, in build order.
    pub const ALL: [Arch; 2] = [Arch::Arm64, Arch::X86_64];

    /// Apple platform name (`arm64` / `x86_64`), as accepted by `clang -arch`
    /// and `lipo`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::X86_64 => "x86_64",
        }
    }

    /// Name FFmpeg's `configure --arch=` expects.
    ///
    /// Distinct from [`as_str()`](Self::as_str): FFmpeg spells ARM64 as
    /// `aarch64`.
    pub fn ffmpeg_name(&self) -> &'static str {
        match self {
            Self::Arm64 => "aarch64",
            Self::X86_64 => "x86_64",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = ArchError;

    /// Only the exact platform names are accepted; no aliases, no case folding.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arm64" => Ok(Self::Arm64),
            "x86_64" => Ok(Self::X86_64),
            other => Err(ArchError::InvalidArchitecture(other.to_string())),
        }
    }
}
