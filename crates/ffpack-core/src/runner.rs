//! External tool invocation.
//!
//! Every subprocess the pipeline starts (`make`, `configure`, `lipo`,
//! `codesign`, the built `ffmpeg`) is described as an [`Invocation`] and
//! handed to a [`CommandRunner`]. The production runner is [`SystemRunner`];
//! tests substitute a recording fake.
//!
//! Environment variables on an invocation apply to that child process only.
//! The orchestrator never mutates its own environment.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;

/// Number of log lines echoed when a logged tool fails.
const FAILURE_TAIL_LINES: usize = 20;

/// Where a tool's stdout/stderr go.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Inherit the terminal.
    #[default]
    Inherit,
    /// Append both streams to this file (the terminal in verbose mode).
    Logged(PathBuf),
    /// Drop both streams; only the exit status matters.
    Discard,
}

/// One subprocess to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name (resolved through `PATH`) or path.
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<String>,
    /// Working directory for the child.
    pub cwd: Option<PathBuf>,
    /// Extra environment for the child only.
    pub env: Vec<(String, String)>,
    /// Output routing.
    pub output: OutputMode,
}

impl Invocation {
    /// Start describing a call to `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            output: OutputMode::Inherit,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a path argument.
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    /// Run the child in `dir`.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set one environment variable on the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Route output to a log file.
    pub fn logged(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = OutputMode::Logged(path.into());
        self
    }

    /// Discard all output.
    pub fn discard_output(mut self) -> Self {
        self.output = OutputMode::Discard;
        self
    }

    /// Value of an environment variable set on this invocation.
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Shell-like rendering for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                if part.contains(' ') {
                    format!("\"{part}\"")
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a finished child exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    code: Option<i32>,
}

impl Outcome {
    /// Exited with `code`.
    pub fn exited(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Killed by a signal (e.g. `SIGILL`), no exit code.
    pub fn signaled() -> Self {
        Self { code: None }
    }

    /// Exit code, if the process exited normally.
    pub fn code(&self) -> Option<i32> {
        self.code
    }

    /// Exit code zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for Outcome {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}

/// Failure to start a child at all.
#[derive(Debug, Error)]
pub enum RunError {
    /// The program is not on `PATH`.
    #[error("'{program}' not found. Please install Xcode Command Line Tools: xcode-select --install")]
    NotFound {
        /// Program that was looked up.
        program: String,
    },

    /// The OS refused to start the program.
    #[error("failed to spawn '{program}'")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The log file could not be created.
    #[error("failed to create log file {}", path.display())]
    Log {
        /// Log file path.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

/// Executes invocations. A non-zero exit is an [`Outcome`], not an error.
pub trait CommandRunner {
    /// Run `invocation` to completion.
    ///
    /// # Errors
    ///
    /// Returns an error only if the process could not be started.
    fn run(&self, invocation: &Invocation) -> Result<Outcome, RunError>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, invocation: &Invocation) -> Result<Outcome, RunError> {
        (**self).run(invocation)
    }
}

/// Runs invocations as real blocking subprocesses.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner {
    verbose: bool,
}

impl SystemRunner {
    /// Create a runner. In verbose mode logged output streams to the terminal.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn resolve(program: &str) -> Result<(), RunError> {
        if program.contains('/') {
            return Ok(());
        }
        which::which(program)
            .map(|_| ())
            .map_err(|_| RunError::NotFound {
                program: program.to_string(),
            })
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<Outcome, RunError> {
        Self::resolve(&invocation.program)?;
        tracing::debug!(cmd = %invocation.command_line(), cwd = ?invocation.cwd, "running");

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }

        let log_path = match &invocation.output {
            OutputMode::Logged(path) if !self.verbose => {
                let log_err = |source| RunError::Log {
                    path: path.clone(),
                    source,
                };
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(log_err)?;
                }
                let log_file = File::create(path).map_err(log_err)?;
                let log_clone = log_file.try_clone().map_err(log_err)?;
                cmd.stdout(Stdio::from(log_clone))
                    .stderr(Stdio::from(log_file));
                Some(path.as_path())
            }
            OutputMode::Discard => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null());
                None
            }
            _ => None,
        };

        let status = cmd.status().map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                RunError::NotFound {
                    program: invocation.program.clone(),
                }
            } else {
                RunError::Spawn {
                    program: invocation.program.clone(),
                    source,
                }
            }
        })?;
        let outcome = Outcome::from(status);

        if !outcome.success() {
            if let Some(log_path) = log_path {
                if let Ok(tail) = read_last_lines(log_path, FAILURE_TAIL_LINES) {
                    eprintln!(
                        "\n{} failed. Last {FAILURE_TAIL_LINES} lines:",
                        invocation.program
                    );
                    eprintln!("{tail}");
                    eprintln!("\nFull log: {}", log_path.display());
                }
            }
        }

        Ok(outcome)
    }
}

/// Read the last N lines from a file efficiently.
///
/// Instead of loading the entire file, we seek to near the end and read a fixed-size
/// tail buffer. FFmpeg's `config.log` style output can run to many megabytes.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn read_last_lines(path: &Path, n: usize) -> std::io::Result<String> {
    // Read at most 16KB from the end (enough for ~400 lines at 40 chars each)
    const TAIL_SIZE: u64 = 16 * 1024;

    let mut file = File::open(path)?;
    let file_len = file.metadata()?.len();

    let seek_pos = file_len.saturating_sub(TAIL_SIZE);
    file.seek(SeekFrom::Start(seek_pos))?;

    let mut raw = Vec::new();
    file.read_to_end(&mut raw)?;
    let decoded = String::from_utf8_lossy(&raw);
    let buffer: &str = &decoded;

    // If we seeked mid-file, skip the first (partial) line
    let content = if seek_pos > 0 {
        buffer.find('\n').map_or(buffer, |idx| &buffer[idx + 1..])
    } else {
        buffer
    };

    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_exit_code_is_reported_not_raised() {
        let runner = SystemRunner::new(false);
        let outcome = runner
            .run(&Invocation::new("sh").args(["-c", "exit 3"]))
            .unwrap();
        assert_eq!(outcome.code(), Some(3));
        assert!(!outcome.success());
    }

    #[test]
    fn test_env_is_scoped_to_child() {
        let tmp = tempdir().unwrap();
        let log = tmp.path().join("logs/env.log");
        let runner = SystemRunner::new(false);
        let outcome = runner
            .run(
                &Invocation::new("sh")
                    .args(["-c", "echo target=$MACOSX_DEPLOYMENT_TARGET"])
                    .env("MACOSX_DEPLOYMENT_TARGET", "12.0")
                    .logged(&log),
            )
            .unwrap();

        assert!(outcome.success());
        let written = std::fs::read_to_string(&log).unwrap();
        assert!(written.contains("target=12.0"));
    }

    #[test]
    fn test_missing_program_is_not_found() {
        let runner = SystemRunner::default();
        let err = runner
            .run(&Invocation::new("definitely-not-a-real-tool-ffpack"))
            .unwrap_err();
        assert!(matches!(err, RunError::NotFound { .. }));
        assert!(err.to_string().contains("xcode-select --install"));
    }

    #[test]
    fn test_command_line_quotes_spaced_args() {
        let inv = Invocation::new("./configure")
            .arg("--extra-cflags=-arch arm64")
            .arg("--enable-small");
        assert_eq!(
            inv.command_line(),
            "./configure \"--extra-cflags=-arch arm64\" --enable-small"
        );
    }

    #[test]
    fn test_read_last_lines() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("build.log");
        let body: String = (1..=50).map(|i| format!("line {i}\n")).collect();
        std::fs::write(&path, body).unwrap();

        let tail = read_last_lines(&path, 3).unwrap();
        assert_eq!(tail, "line 48\nline 49\nline 50");
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::exited(1).to_string(), "exit code 1");
        assert_eq!(Outcome::signaled().to_string(), "terminated by signal");
    }
}
