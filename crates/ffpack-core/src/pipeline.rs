//! The build orchestrator.
//!
//! Runs fetch → build (per architecture) → merge → sign → publish → verify
//! strictly in sequence. The first failure aborts the run; nothing is rolled
//! back and every intermediate artifact stays on disk for inspection.

use std::time::Instant;

use ffpack_schema::BuildArtifact;
use reqwest::Client;

use crate::Reporter;
use crate::builder::ArchBuilder;
use crate::config::BuildConfig;
use crate::error::PipelineError;
use crate::io::download::{FetchOutcome, fetch_source};
use crate::paths::Layout;
use crate::publish::Published;
use crate::runner::CommandRunner;
use crate::{combine, publish, sign, verify};

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// What the fetch step did.
    pub fetch: FetchOutcome,
    /// Per-architecture binaries, in build order.
    pub built: Vec<BuildArtifact>,
    /// Universal binary, or the single architecture's binary.
    pub final_artifact: BuildArtifact,
    /// Published binary and license.
    pub published: Published,
    /// Whether the binary was signed.
    pub signed: bool,
    /// Whether the published binary was executed successfully.
    pub verified: bool,
}

/// Groups the state every step needs.
#[derive(Debug)]
pub struct Pipeline<'a, R: CommandRunner, P: Reporter + ?Sized> {
    config: &'a BuildConfig,
    layout: &'a Layout,
    runner: &'a R,
    reporter: &'a P,
    client: Client,
}

impl<'a, R: CommandRunner, P: Reporter + ?Sized> Pipeline<'a, R, P> {
    /// Create a pipeline.
    pub fn new(config: &'a BuildConfig, layout: &'a Layout, runner: &'a R, reporter: &'a P) -> Self {
        Self {
            config,
            layout,
            runner,
            reporter,
            client: Client::new(),
        }
    }

    /// Use a preconfigured HTTP client for the source download.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Run every step in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`PipelineError`] raised by any step.
    pub async fn run(&self) -> Result<PipelineReport, PipelineError> {
        let started = Instant::now();
        let config = self.config;
        let reporter = self.reporter;

        // 1. Sources
        reporter.section(&format!("Fetching FFmpeg {}", config.version));
        let fetch = fetch_source(&self.client, self.layout, reporter).await?;
        let source_dir = fetch.source_dir().display();
        match &fetch {
            FetchOutcome::AlreadyPresent(_) => {
                reporter.info(&format!("Using existing sources at {source_dir}"));
            }
            FetchOutcome::Downloaded { sha256, size, .. } => {
                reporter.success(&format!(
                    "Downloaded {size} bytes (sha256 {sha256}) into {source_dir}"
                ));
            }
        }

        // 2. Per-architecture builds, one after the other in the shared tree
        let builder = ArchBuilder::new(self.runner, self.layout, config);
        let mut built = Vec::new();
        for arch in config.targets() {
            reporter.section(&format!("Building {arch}"));
            let artifact = builder.build(arch)?;
            reporter.success(&format!("{arch}: {}", artifact.path().display()));
            built.push(artifact);
        }

        // 3. Merge
        let final_artifact = if config.is_universal() {
            reporter.section("Creating universal binary");
            let universal = combine::merge(self.runner, self.layout, &built)?;
            reporter.success(&format!("universal: {}", universal.path().display()));
            universal
        } else {
            built[0].clone()
        };

        // 4. Sign
        if config.sign {
            reporter.section("Signing");
            sign::sign(
                self.runner,
                self.layout,
                &final_artifact,
                config.resolved_identity(),
            )?;
            reporter.success("Signed with hardened runtime");
        }

        // 5. Publish
        reporter.section("Publishing");
        let published = publish::publish(self.layout, &final_artifact, reporter)?;
        reporter.success(&published.binary.path().display().to_string());

        // 6. Verify
        if config.verify {
            reporter.section("Verifying");
            verify::verify(self.runner, &published.binary)?;
            reporter.success("Binary runs");
        }

        reporter.summary(
            &format!("ffmpeg {} ({})", config.version, final_artifact.label()),
            started.elapsed().as_secs_f64(),
        );

        Ok(PipelineReport {
            fetch,
            built,
            final_artifact,
            published,
            signed: config.sign,
            verified: config.verify,
        })
    }
}
