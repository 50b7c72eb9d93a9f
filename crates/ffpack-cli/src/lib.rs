//! ffpack - minimal static FFmpeg for macOS
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Command-line front end for `ffpack-core`. Parses flags into a
//! [`BuildConfig`], runs the [`Pipeline`] with real subprocesses and a
//! terminal reporter, and maps failures to distinct exit codes.
//!
//! # Directory Layout
//!
//! ```text
//! $FFPACK_ROOT (or cwd)/
//! ├── build/          # sources, per-arch prefixes, logs
//! └── resources/bin/  # ffmpeg + ffmpeg-LICENSE.md
//! ```

pub mod ui;

use clap::Parser;
use ffpack_core::config::IDENTITY_ENV;
use ffpack_core::{BuildConfig, Layout, Pipeline, PipelineError, PipelineReport, SystemRunner};
use ffpack_schema::{Arch, FFMPEG_VERSION, MinOsVersion};

use crate::ui::ConsoleReporter;

/// Exit code for failures outside the pipeline (project root, runtime setup).
pub const EXIT_OTHER: u8 = 1;

/// Parsed command line.
#[derive(Debug, Parser)]
#[command(name = "ffpack")]
#[command(about = "Build a minimal, statically linked FFmpeg for macOS")]
#[command(
    long_about = "Fetches the FFmpeg sources, builds arm64 and x86_64 with only MP3/WAV \
                  decoding and PCM WAV encoding enabled, merges them into a universal \
                  binary and publishes it to resources/bin."
)]
pub struct Cli {
    /// Code-sign the final binary (needs --identity or IDENTITY)
    #[arg(long)]
    pub sign: bool,

    /// Run the published binary once to check that it starts
    #[arg(long)]
    pub verify: bool,

    /// Build only this architecture and skip the universal merge [arm64, x86_64]
    #[arg(long, value_name = "ARCH")]
    pub arch: Option<Arch>,

    /// Minimum macOS version for every architecture
    #[arg(long, value_name = "VERSION", default_value_t = MinOsVersion::default())]
    pub min_version: MinOsVersion,

    /// Code signing identity, e.g. "Developer ID Application: Name (TEAMID)"
    #[arg(long, env = IDENTITY_ENV, value_name = "IDENTITY")]
    pub identity: Option<String>,

    /// Keep FFmpeg's assembly optimizations (may SIGILL on older CPUs)
    #[arg(long)]
    pub enable_asm: bool,

    /// Stream tool output to the terminal instead of build/logs
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Turn parsed flags into the pipeline configuration.
    pub fn into_config(self) -> BuildConfig {
        BuildConfig {
            version: FFMPEG_VERSION.to_string(),
            sign: self.sign,
            verify: self.verify,
            single_arch: self.arch,
            min_os_version: self.min_version,
            signing_identity: self.identity,
            disable_assembly: !self.enable_asm,
            verbose: self.verbose,
        }
    }
}

/// Run the full pipeline for `config` against the project root from the
/// environment.
pub async fn run(config: &BuildConfig, reporter: &ConsoleReporter) -> anyhow::Result<PipelineReport> {
    let layout = Layout::from_env(config.version.as_str())
        .map_err(|e| anyhow::anyhow!("cannot determine project root: {e}"))?;
    tracing::debug!(root = %layout.root().display(), ?config, "starting build");

    let runner = SystemRunner::new(config.verbose);
    let report = Pipeline::new(config, &layout, &runner, reporter).run().await?;
    Ok(report)
}

/// Process exit code for a failed run.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<PipelineError>()
        .map_or(EXIT_OTHER, PipelineError::exit_code)
}

/// One-line message for a failed run: each cause in the chain, once, joined
/// with `: `.
pub fn error_message(err: &anyhow::Error) -> String {
    format!("{err:#}")
}
