//! Filesystem layout of a build.
//!
//! Everything lives under a single project root:
//!
//! ```text
//! <root>/
//! ├── build/
//! │   ├── ffmpeg-<v>.tar.gz      # downloaded archive
//! │   ├── ffmpeg-<v>/            # shared source tree
//! │   ├── out/<arch>/bin/ffmpeg  # per-architecture install prefixes
//! │   ├── out/universal/ffmpeg   # lipo output
//! │   └── logs/                  # tool output, one file per step
//! └── resources/bin/             # published binary + license
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use ffpack_schema::{Arch, FFMPEG_BINARY};

/// Upstream release archive.
pub const FFMPEG_RELEASES_URL: &str = "https://ffmpeg.org/releases";

/// Environment variable overriding the project root.
pub const ROOT_ENV: &str = "FFPACK_ROOT";

/// Resolved paths for one FFmpeg version under one project root.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    version: String,
    releases_url: String,
}

impl Layout {
    /// Layout rooted at `root` for the given FFmpeg version.
    pub fn new(root: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            version: version.into(),
            releases_url: FFMPEG_RELEASES_URL.to_string(),
        }
    }

    /// Layout rooted at `$FFPACK_ROOT`, falling back to the current directory.
    ///
    /// A relative `FFPACK_ROOT` is resolved against the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn from_env(version: impl Into<String>) -> std::io::Result<Self> {
        let root = resolve_root(std::env::var_os(ROOT_ENV))?;
        Ok(Self::new(root, version))
    }

    /// Fetch sources from a different release mirror.
    pub fn with_releases_url(mut self, url: impl Into<String>) -> Self {
        self.releases_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// FFmpeg version this layout describes.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Scratch area for everything the build produces: `<root>/build`
    pub fn work_dir(&self) -> PathBuf {
        self.root.join("build")
    }

    /// Directory name of the extracted tarball (`ffmpeg-7.1.1`).
    pub fn source_dir_name(&self) -> String {
        format!("ffmpeg-{}", self.version)
    }

    /// Shared source tree: `<root>/build/ffmpeg-<v>`
    pub fn source_dir(&self) -> PathBuf {
        self.work_dir().join(self.source_dir_name())
    }

    /// Downloaded archive: `<root>/build/ffmpeg-<v>.tar.gz`
    pub fn archive_path(&self) -> PathBuf {
        self.work_dir()
            .join(format!("{}.tar.gz", self.source_dir_name()))
    }

    /// Download URL of the source archive.
    pub fn source_url(&self) -> String {
        format!("{}/{}.tar.gz", self.releases_url, self.source_dir_name())
    }

    /// Install prefix for one architecture: `<root>/build/out/<arch>`
    pub fn prefix(&self, arch: Arch) -> PathBuf {
        self.work_dir().join("out").join(arch.as_str())
    }

    /// Installed binary for one architecture.
    pub fn arch_binary(&self, arch: Arch) -> PathBuf {
        self.prefix(arch).join("bin").join(FFMPEG_BINARY)
    }

    /// Merged binary: `<root>/build/out/universal/ffmpeg`
    pub fn universal_binary(&self) -> PathBuf {
        self.work_dir()
            .join("out")
            .join("universal")
            .join(FFMPEG_BINARY)
    }

    /// Logs directory: `<root>/build/logs`
    pub fn log_dir(&self) -> PathBuf {
        self.work_dir().join("logs")
    }

    /// Generate a log path for one tool invocation.
    pub fn log_path(&self, step: &str, arch: Option<Arch>) -> PathBuf {
        let timestamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
        let name = match arch {
            Some(arch) => format!("{step}-{arch}-{timestamp}.log"),
            None => format!("{step}-{timestamp}.log"),
        };
        self.log_dir().join(name)
    }

    /// Application resource directory the binary is published into.
    pub fn resources_dir(&self) -> PathBuf {
        self.root.join("resources").join("bin")
    }

    /// Published binary: `<root>/resources/bin/ffmpeg`
    pub fn published_binary(&self) -> PathBuf {
        self.resources_dir().join(FFMPEG_BINARY)
    }

    /// License shipped inside the source tree.
    pub fn license_source(&self) -> PathBuf {
        self.source_dir().join("LICENSE.md")
    }

    /// Published license: `<root>/resources/bin/ffmpeg-LICENSE.md`
    pub fn published_license(&self) -> PathBuf {
        self.resources_dir().join("ffmpeg-LICENSE.md")
    }
}

/// Absolute project root from an optional `FFPACK_ROOT` value.
///
/// Tools run with the source tree as their working directory, so every path
/// handed to them (`configure`, `--prefix`) must be absolute.
pub(crate) fn resolve_root(value: Option<OsString>) -> std::io::Result<PathBuf> {
    match value {
        Some(val) if !val.is_empty() => std::path::absolute(val),
        _ => std::env::current_dir(),
    }
}

/// Extract the filename from a URL.
pub fn filename_from_url(url: &str) -> &str {
    url.split('/').next_back().unwrap_or("")
}
