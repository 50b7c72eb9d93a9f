//! Build artifacts handed from one pipeline step to the next.

use std::path::{Path, PathBuf};

use crate::Arch;

/// An executable produced by the build, tagged with the slices it contains.
///
/// Produced by the per-architecture builder, then passed by value through
/// the combiner, signer, publisher and verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    path: PathBuf,
    arches: Vec<Arch>,
}

impl BuildArtifact {
    /// A thin binary containing a single architecture.
    pub fn single(path: impl Into<PathBuf>, arch: Arch) -> Self {
        Self {
            path: path.into(),
            arches: vec![arch],
        }
    }

    /// A universal binary containing every supported architecture.
    pub fn universal(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            arches: Arch::ALL.to_vec(),
        }
    }

    /// Same slices, new location (e.g. after publishing).
    pub fn relocated(&self, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            arches: self.arches.clone(),
        }
    }

    /// Location of the executable on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Architectures contained in the executable.
    pub fn arches(&self) -> &[Arch] {
        &self.arches
    }

    /// Whether the executable carries more than one architecture.
    pub fn is_universal(&self) -> bool {
        self.arches.len() > 1
    }

    /// Short human label: `arm64`, `x86_64` or `universal`.
    pub fn label(&self) -> String {
        if self.is_universal() {
            "universal".to_string()
        } else {
            self.arches
                .iter()
                .map(Arch::as_str)
                .collect::<Vec<_>>()
                .join("+")
        }
    }
}
