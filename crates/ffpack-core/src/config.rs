//! Build configuration.

use ffpack_schema::{Arch, FFMPEG_VERSION, MinOsVersion};

/// Environment variable consulted for the signing identity when none is
/// passed explicitly.
pub const IDENTITY_ENV: &str = "IDENTITY";

/// Everything the pipeline needs to know, decided once before it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// FFmpeg source version to fetch and build.
    pub version: String,
    /// Code-sign the final binary.
    pub sign: bool,
    /// Run the published binary once after the build.
    pub verify: bool,
    /// Build only this architecture and skip the universal merge.
    pub single_arch: Option<Arch>,
    /// Deployment target for every architecture.
    pub min_os_version: MinOsVersion,
    /// Signing identity (flag value, or `IDENTITY` from the environment).
    pub signing_identity: Option<String>,
    /// Pass `--disable-asm` to FFmpeg's configure.
    pub disable_assembly: bool,
    /// Stream tool output instead of writing log files.
    pub verbose: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            version: FFMPEG_VERSION.to_string(),
            sign: false,
            verify: false,
            single_arch: None,
            min_os_version: MinOsVersion::default(),
            signing_identity: None,
            // Hand-written assembly has produced SIGILL on older CPUs; keep it
            // off unless asked for.
            disable_assembly: true,
            verbose: false,
        }
    }
}

impl BuildConfig {
    /// Architectures to build, in order.
    pub fn targets(&self) -> Vec<Arch> {
        match self.single_arch {
            Some(arch) => vec![arch],
            None => Arch::ALL.to_vec(),
        }
    }

    /// Whether the per-architecture binaries get merged with `lipo`.
    pub fn is_universal(&self) -> bool {
        self.single_arch.is_none()
    }

    /// Signing identity, treating empty or blank values as absent.
    pub fn resolved_identity(&self) -> Option<&str> {
        self.signing_identity
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}
