//! macOS deployment target versions.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Dotted numeric version with one to three components (`11`, `11.0`, `10.15.7`).
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+){0,2}$").expect("valid static pattern"));

/// Error returned for a malformed deployment target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The value is not a dotted numeric version.
    #[error("invalid minimum macOS version '{0}' (expected e.g. '11.0')")]
    Invalid(String),
}

/// Minimum macOS version the produced binary declares compatibility with.
///
/// Passed to the compiler and linker as `-mmacosx-version-min` and to the
/// build tools as `MACOSX_DEPLOYMENT_TARGET`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MinOsVersion(String);

impl MinOsVersion {
    /// Big Sur, the first release with Apple Silicon support.
    pub const DEFAULT: &'static str = "11.0";

    /// Borrow the version string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MinOsVersion {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl std::fmt::Display for MinOsVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for MinOsVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if VERSION_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(VersionError::Invalid(s.to_string()))
        }
    }
}
