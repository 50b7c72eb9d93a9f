//! End-to-end sequencing tests driven through a recording fake runner.
//!
//! The fake simulates the side effects the real tools would have
//! (`make install` drops a binary into the configured prefix, `lipo` writes
//! its `-output`) so the pipeline's own filesystem checks are exercised.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ffpack_core::runner::RunError;
use ffpack_core::{
    BuildConfig, CommandRunner, Invocation, Layout, NullReporter, Outcome, Pipeline,
    PipelineError, Reporter,
};
use ffpack_schema::Arch;
use tempfile::TempDir;

type Rule = Box<dyn Fn(&Invocation) -> Option<Outcome> + Send + Sync>;

/// Records every invocation and fakes tool side effects.
#[derive(Default)]
struct FakeRunner {
    calls: Mutex<Vec<Invocation>>,
    prefix: Mutex<Option<PathBuf>>,
    rules: Vec<Rule>,
}

impl FakeRunner {
    /// Override the outcome of matching invocations.
    fn with_rule(
        mut self,
        rule: impl Fn(&Invocation) -> Option<Outcome> + Send + Sync + 'static,
    ) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, pred: impl Fn(&Invocation) -> bool) -> usize {
        self.calls().iter().filter(|&inv| pred(inv)).count()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, inv: &Invocation) -> Result<Outcome, RunError> {
        self.calls.lock().unwrap().push(inv.clone());

        if let Some(outcome) = self.rules.iter().find_map(|rule| rule(inv)) {
            return Ok(outcome);
        }

        if is_configure(inv) {
            let prefix = inv
                .args
                .iter()
                .find_map(|a| a.strip_prefix("--prefix="))
                .map(PathBuf::from);
            *self.prefix.lock().unwrap() = prefix;
        } else if is_make(inv, "install") {
            let prefix = self.prefix.lock().unwrap().clone().expect("install before configure");
            write_binary(&prefix.join("bin/ffmpeg"));
        } else if inv.program == "lipo" {
            let out = inv
                .args
                .iter()
                .skip_while(|a| *a != "-output")
                .nth(1)
                .expect("lipo without -output");
            write_binary(Path::new(out));
        }

        Ok(Outcome::exited(0))
    }
}

/// Captures info and warnings so tests can assert on non-fatal conditions.
#[derive(Default)]
struct RecordingReporter {
    infos: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
}

impl Reporter for RecordingReporter {
    fn section(&self, _: &str) {}
    fn downloading(&self, _: u64, _: Option<u64>) {}
    fn info(&self, msg: &str) {
        self.infos.lock().unwrap().push(msg.to_string());
    }
    fn success(&self, _: &str) {}
    fn warning(&self, msg: &str) {
        self.warnings.lock().unwrap().push(msg.to_string());
    }
    fn error(&self, _: &str) {}
    fn summary(&self, _: &str, _: f64) {}
}

fn write_binary(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, "#!/bin/sh\nexit 0\n").unwrap();
}

fn is_configure(inv: &Invocation) -> bool {
    inv.program.ends_with("/configure")
}

fn is_make(inv: &Invocation, target: &str) -> bool {
    inv.program == "make" && inv.args.first().is_some_and(|a| a == target)
}

fn is_verify(inv: &Invocation) -> bool {
    inv.program.ends_with("resources/bin/ffmpeg")
}

/// Temp project with an already-extracted source tree (so no network).
fn project(with_license: bool) -> (TempDir, Layout) {
    let tmp = TempDir::new().unwrap();
    let layout = Layout::new(tmp.path(), "7.1.1");
    std::fs::create_dir_all(layout.source_dir()).unwrap();
    if with_license {
        std::fs::write(layout.license_source(), "GNU LGPL 2.1").unwrap();
    }
    (tmp, layout)
}

#[tokio::test]
async fn test_single_arch_builds_one_binary_without_merge() {
    for arch in Arch::ALL {
        let (_tmp, layout) = project(true);
        let runner = FakeRunner::default();
        let config = BuildConfig {
            single_arch: Some(arch),
            ..BuildConfig::default()
        };

        let report = Pipeline::new(&config, &layout, &runner, &NullReporter)
            .run()
            .await
            .unwrap();

        assert!(layout.arch_binary(arch).is_file());
        let other = Arch::ALL.into_iter().find(|a| *a != arch).unwrap();
        assert!(!layout.prefix(other).exists());
        assert_eq!(runner.count(|inv| inv.program == "lipo"), 0);
        assert_eq!(runner.count(is_configure), 1);
        assert!(!report.final_artifact.is_universal());
        assert_eq!(report.final_artifact.path(), layout.arch_binary(arch));
    }
}

#[tokio::test]
async fn test_universal_builds_both_and_merges_once() {
    let (_tmp, layout) = project(true);
    let runner = FakeRunner::default();
    let config = BuildConfig::default();

    let report = Pipeline::new(&config, &layout, &runner, &NullReporter)
        .run()
        .await
        .unwrap();

    assert!(layout.arch_binary(Arch::Arm64).is_file());
    assert!(layout.arch_binary(Arch::X86_64).is_file());
    assert_eq!(runner.count(|inv| inv.program == "lipo"), 1);

    let lipo = runner
        .calls()
        .into_iter()
        .find(|inv| inv.program == "lipo")
        .unwrap();
    assert_eq!(lipo.args[0], "-create");
    assert!(lipo.args.contains(&layout.arch_binary(Arch::Arm64).to_string_lossy().to_string()));
    assert!(lipo.args.contains(&layout.arch_binary(Arch::X86_64).to_string_lossy().to_string()));

    assert!(report.final_artifact.is_universal());
    assert!(layout.universal_binary().is_file());
    assert!(layout.published_binary().is_file());
}

#[tokio::test]
async fn test_clean_precedes_configure_for_every_arch() {
    let (_tmp, layout) = project(true);
    let runner = FakeRunner::default();
    let config = BuildConfig::default();

    Pipeline::new(&config, &layout, &runner, &NullReporter)
        .run()
        .await
        .unwrap();

    let steps: Vec<&str> = runner
        .calls()
        .iter()
        .filter_map(|inv| {
            if is_configure(inv) {
                Some("configure")
            } else if is_make(inv, "distclean") {
                Some("clean")
            } else if is_make(inv, "install") {
                Some("install")
            } else if inv.program == "make" {
                Some("make")
            } else {
                None
            }
        })
        .collect();

    assert_eq!(
        steps,
        [
            "clean", "configure", "make", "install", "clean", "configure", "make", "install"
        ]
    );
}

#[tokio::test]
async fn test_min_version_reaches_every_build_invocation() {
    for (requested, expected) in [(None, "11.0"), (Some("12.0"), "12.0")] {
        let (_tmp, layout) = project(true);
        let runner = FakeRunner::default();
        let mut config = BuildConfig::default();
        if let Some(v) = requested {
            config.min_os_version = v.parse().unwrap();
        }

        Pipeline::new(&config, &layout, &runner, &NullReporter)
            .run()
            .await
            .unwrap();

        let builds: Vec<Invocation> = runner
            .calls()
            .into_iter()
            .filter(|inv| is_configure(inv) || inv.program == "make")
            .collect();
        assert_eq!(builds.len(), 8);
        for inv in &builds {
            assert_eq!(inv.env_value("MACOSX_DEPLOYMENT_TARGET"), Some(expected));
        }

        let flag = format!("-mmacosx-version-min={expected}");
        for inv in builds.iter().filter(|inv| is_configure(inv)) {
            let cflags = inv
                .args
                .iter()
                .find(|a| a.starts_with("--extra-cflags="))
                .unwrap();
            let ldflags = inv
                .args
                .iter()
                .find(|a| a.starts_with("--extra-ldflags="))
                .unwrap();
            assert!(cflags.ends_with(&flag));
            assert!(ldflags.ends_with(&flag));
        }
    }
}

#[tokio::test]
async fn test_sign_without_identity_aborts_before_codesign() {
    // Neither flag nor environment, then blank values from either.
    for identity in [None, Some(""), Some("   ")] {
        let (_tmp, layout) = project(true);
        let runner = FakeRunner::default();
        let config = BuildConfig {
            sign: true,
            signing_identity: identity.map(String::from),
            single_arch: Some(Arch::Arm64),
            ..BuildConfig::default()
        };

        let err = Pipeline::new(&config, &layout, &runner, &NullReporter)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::MissingSigningIdentity), "{identity:?}");
        assert_eq!(err.exit_code(), 6);
        assert!(err.to_string().contains("security find-identity -v -p codesigning"));
        assert_eq!(runner.count(|inv| inv.program == "codesign"), 0);
        assert!(!layout.published_binary().exists());
    }
}

#[tokio::test]
async fn test_sign_runs_codesign_on_final_binary() {
    let (_tmp, layout) = project(true);
    let runner = FakeRunner::default();
    let config = BuildConfig {
        sign: true,
        verify: true,
        signing_identity: Some("Developer ID Application: Example (ABCDE12345)".into()),
        ..BuildConfig::default()
    };

    let report = Pipeline::new(&config, &layout, &runner, &NullReporter)
        .run()
        .await
        .unwrap();
    assert!(report.signed);

    let calls = runner.calls();
    let lipo_at = calls.iter().position(|inv| inv.program == "lipo").unwrap();
    let sign_at = calls.iter().position(|inv| inv.program == "codesign").unwrap();
    let verify_at = calls.iter().position(is_verify).unwrap();
    assert!(lipo_at < sign_at && sign_at < verify_at);

    let codesign = &calls[sign_at];
    assert!(codesign.args.windows(2).any(|w| w == ["--options", "runtime"]));
    assert!(codesign.args.contains(&"--timestamp".to_string()));
    assert_eq!(
        codesign.args.last().unwrap(),
        &layout.universal_binary().to_string_lossy().to_string()
    );
}

#[tokio::test]
async fn test_codesign_failure_is_sign_error() {
    let (_tmp, layout) = project(true);
    let runner = FakeRunner::default()
        .with_rule(|inv| (inv.program == "codesign").then(|| Outcome::exited(1)));
    let config = BuildConfig {
        sign: true,
        single_arch: Some(Arch::X86_64),
        signing_identity: Some("-".into()),
        ..BuildConfig::default()
    };

    let err = Pipeline::new(&config, &layout, &runner, &NullReporter)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Sign { .. }));
    assert_eq!(err.exit_code(), 7);
}

#[tokio::test]
async fn test_verification_failure_is_distinct_from_build_failure() {
    let (_tmp, layout) = project(true);
    let runner = FakeRunner::default().with_rule(|inv| is_verify(inv).then(Outcome::signaled));
    let config = BuildConfig {
        verify: true,
        single_arch: Some(Arch::Arm64),
        ..BuildConfig::default()
    };

    let err = Pipeline::new(&config, &layout, &runner, &NullReporter)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::VerificationFailed { .. }));
    assert_eq!(err.exit_code(), 9);
    assert!(err.to_string().starts_with("Verification failed"));
    // Artifacts are retained after a failed verification.
    assert!(layout.published_binary().is_file());
}

#[tokio::test]
async fn test_build_failure_stops_before_next_arch() {
    let (_tmp, layout) = project(true);
    let runner = FakeRunner::default().with_rule(|inv| {
        (inv.program == "make" && inv.args.first().is_some_and(|a| a.starts_with("-j")))
            .then(|| Outcome::exited(2))
    });
    let config = BuildConfig::default();

    let err = Pipeline::new(&config, &layout, &runner, &NullReporter)
        .run()
        .await
        .unwrap_err();

    match &err {
        PipelineError::Build { arch, step, .. } => {
            assert_eq!(*arch, Arch::Arm64);
            assert_eq!(step.as_str(), "make");
        }
        other => panic!("expected build error, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 4);
    assert_eq!(runner.count(is_configure), 1);
    assert_eq!(runner.count(|inv| inv.program == "lipo"), 0);
}

#[tokio::test]
async fn test_failed_distclean_is_tolerated() {
    let (_tmp, layout) = project(true);
    let runner = FakeRunner::default()
        .with_rule(|inv| is_make(inv, "distclean").then(|| Outcome::exited(2)));
    let config = BuildConfig {
        single_arch: Some(Arch::X86_64),
        ..BuildConfig::default()
    };

    Pipeline::new(&config, &layout, &runner, &NullReporter)
        .run()
        .await
        .unwrap();
    assert!(layout.published_binary().is_file());
}

#[tokio::test]
async fn test_missing_license_warns_and_continues() {
    let (_tmp, layout) = project(false);
    let runner = FakeRunner::default();
    let reporter = RecordingReporter::default();
    let config = BuildConfig {
        single_arch: Some(Arch::Arm64),
        ..BuildConfig::default()
    };

    let report = Pipeline::new(&config, &layout, &runner, &reporter)
        .run()
        .await
        .unwrap();

    assert!(report.published.license.is_none());
    assert!(layout.published_binary().is_file());
    let warnings = reporter.warnings.lock().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("License file not found"));

    let infos = reporter.infos.lock().unwrap();
    let reused = format!("Using existing sources at {}", layout.source_dir().display());
    assert!(infos.contains(&reused), "{infos:?}");
}

#[tokio::test]
async fn test_arm64_verify_end_to_end() {
    let (_tmp, layout) = project(true);
    let runner = FakeRunner::default();
    let config = BuildConfig {
        single_arch: Some(Arch::Arm64),
        verify: true,
        ..BuildConfig::default()
    };

    let report = Pipeline::new(&config, &layout, &runner, &NullReporter)
        .run()
        .await
        .unwrap();

    assert!(report.verified);
    assert!(layout.arch_binary(Arch::Arm64).is_file());
    assert!(layout.published_binary().is_file());
    assert!(layout.published_license().is_file());

    let verify = runner.calls().into_iter().find(is_verify).unwrap();
    assert_eq!(verify.args, ["-version", "-hide_banner", "-loglevel", "error"]);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(layout.published_binary())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}
