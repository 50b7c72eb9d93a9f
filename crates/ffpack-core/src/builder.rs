//! Per-architecture FFmpeg builds.
//!
//! Each architecture is built in the one shared source tree, so every build
//! starts with `make distclean`. Skipping it would let objects from the
//! previous architecture leak into the next link.
//!
//! ## Invocation contract
//!
//! | Step | Command | Failure |
//! |---|---|---|
//! | clean | `make distclean` | tolerated (fresh tree has no Makefile) |
//! | configure | `<src>/configure` + [`FEATURE_FLAGS`] + arch flags | fatal |
//! | make | `make -j<logical CPUs>` | fatal |
//! | install | `make install` | fatal |
//!
//! All four run with cwd = source tree and `MACOSX_DEPLOYMENT_TARGET` set on
//! the child only.

use ffpack_schema::{Arch, BuildArtifact};

use crate::config::BuildConfig;
use crate::error::PipelineError;
use crate::paths::Layout;
use crate::runner::{CommandRunner, Invocation};

/// Feature set shared by every architecture: nothing but MP3/WAV in, PCM
/// WAV out, plus resampling.
pub const FEATURE_FLAGS: &[&str] = &[
    "--disable-everything",
    "--enable-protocol=file",
    "--enable-decoder=mp3,pcm_s16le",
    "--enable-encoder=pcm_s16le",
    "--enable-demuxer=mp3,wav",
    "--enable-muxer=wav,pcm_s16le",
    "--enable-filter=aresample",
    "--disable-network",
    "--disable-autodetect",
    "--disable-doc",
    "--disable-shared",
    "--enable-static",
    "--enable-small",
];

/// Avoids hand-written SIMD that can raise `SIGILL` on older CPUs.
pub const DISABLE_ASM_FLAG: &str = "--disable-asm";

/// One stage of a per-architecture build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    /// `make distclean`
    Clean,
    /// `./configure ...`
    Configure,
    /// `make -jN`
    Make,
    /// `make install`
    Install,
}

impl BuildStep {
    /// Short name used in log file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Configure => "configure",
            Self::Make => "make",
            Self::Install => "install",
        }
    }
}

impl std::fmt::Display for BuildStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds one architecture at a time in the shared source tree.
#[derive(Debug)]
pub struct ArchBuilder<'a, R: CommandRunner> {
    runner: &'a R,
    layout: &'a Layout,
    config: &'a BuildConfig,
}

impl<'a, R: CommandRunner> ArchBuilder<'a, R> {
    /// Create a builder over `layout` using `runner` for every tool call.
    pub fn new(runner: &'a R, layout: &'a Layout, config: &'a BuildConfig) -> Self {
        Self {
            runner,
            layout,
            config,
        }
    }

    /// Arguments passed to `configure` for `arch`.
    pub fn configure_args(&self, arch: Arch) -> Vec<String> {
        let min = self.config.min_os_version.as_str();
        let target_flags = format!("-arch {} -mmacosx-version-min={min}", arch.as_str());

        let mut args: Vec<String> = FEATURE_FLAGS.iter().map(ToString::to_string).collect();
        if self.config.disable_assembly {
            args.push(DISABLE_ASM_FLAG.to_string());
        }
        args.extend([
            format!("--arch={}", arch.ffmpeg_name()),
            "--target-os=darwin".to_string(),
            "--enable-cross-compile".to_string(),
            "--cc=clang".to_string(),
            format!("--extra-cflags={target_flags}"),
            format!("--extra-ldflags={target_flags}"),
            format!("--prefix={}", self.layout.prefix(arch).display()),
        ]);
        args
    }

    /// Clean, configure, compile and install `arch`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Build`] on the first non-zero exit of
    /// configure, make or install, and [`PipelineError::MissingBuildOutput`]
    /// if install succeeds without producing the binary.
    pub fn build(&self, arch: Arch) -> Result<BuildArtifact, PipelineError> {
        let jobs = num_cpus::get();
        tracing::info!(%arch, jobs, min_os = %self.config.min_os_version, "building");

        let clean = self.runner.run(&self.invocation("make", BuildStep::Clean, arch).arg("distclean"))?;
        if !clean.success() {
            tracing::warn!(%arch, %clean, "make distclean failed (nothing to clean?)");
        }

        let configure = self
            .invocation(
                self.layout.source_dir().join("configure").to_string_lossy(),
                BuildStep::Configure,
                arch,
            )
            .args(self.configure_args(arch));
        self.run_step(&configure, BuildStep::Configure, arch)?;

        let make = self
            .invocation("make", BuildStep::Make, arch)
            .arg(format!("-j{jobs}"));
        self.run_step(&make, BuildStep::Make, arch)?;

        let install = self
            .invocation("make", BuildStep::Install, arch)
            .arg("install");
        self.run_step(&install, BuildStep::Install, arch)?;

        let binary = self.layout.arch_binary(arch);
        if !binary.is_file() {
            return Err(PipelineError::MissingBuildOutput { arch, path: binary });
        }
        Ok(BuildArtifact::single(binary, arch))
    }

    fn invocation(&self, program: impl Into<String>, step: BuildStep, arch: Arch) -> Invocation {
        Invocation::new(program)
            .current_dir(self.layout.source_dir())
            .env(
                "MACOSX_DEPLOYMENT_TARGET",
                self.config.min_os_version.as_str(),
            )
            .logged(self.layout.log_path(step.as_str(), Some(arch)))
    }

    fn run_step(
        &self,
        invocation: &Invocation,
        step: BuildStep,
        arch: Arch,
    ) -> Result<(), PipelineError> {
        let outcome = self.runner.run(invocation)?;
        if outcome.success() {
            Ok(())
        } else {
            Err(PipelineError::Build {
                arch,
                step,
                outcome,
            })
        }
    }
}
