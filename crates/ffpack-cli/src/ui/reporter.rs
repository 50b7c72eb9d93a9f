//! Console implementation of the core `Reporter`.

use std::io::{IsTerminal, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use crossterm::style::Stylize;
use ffpack_core::Reporter;

use super::theme::{Theme, format_size};

const NOT_STARTED: u64 = u64::MAX;
const MIB: u64 = 1024 * 1024;

/// Prints progress to the terminal with the ffpack theme.
#[derive(Debug)]
pub struct ConsoleReporter {
    theme: Theme,
    /// Last rendered progress step, so redraws happen once per percent (or
    /// once per MiB when the size is unknown).
    last_step: AtomicU64,
    interactive: bool,
}

impl ConsoleReporter {
    /// Reporter writing to stdout/stderr.
    pub fn new() -> Self {
        Self {
            theme: Theme::default(),
            last_step: AtomicU64::new(NOT_STARTED),
            interactive: std::io::stderr().is_terminal(),
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress bucket for a download position.
fn progress_step(current: u64, total: Option<u64>) -> u64 {
    match total {
        Some(total) if total > 0 => current.min(total).saturating_mul(100) / total,
        _ => current / MIB,
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        println!();
        println!(
            "{} {}",
            title.with(self.theme.colors.header).bold(),
            "─".repeat(self.theme.rule_width).with(self.theme.colors.secondary)
        );
    }

    fn downloading(&self, current: u64, total: Option<u64>) {
        let step = progress_step(current, total);
        if self.last_step.swap(step, Ordering::Relaxed) == step {
            return;
        }

        let progress = match total {
            Some(total) if total > 0 => {
                format!("{} / {} ({step}%)", format_size(current), format_size(total))
            }
            _ => format_size(current),
        };
        let done = total.is_some_and(|total| current >= total);

        let mut err = std::io::stderr();
        if self.interactive {
            let _ = write!(
                err,
                "\r  {} Downloading {}",
                self.theme.icons.active.with(self.theme.colors.active),
                progress.with(self.theme.colors.secondary)
            );
            if done {
                let _ = writeln!(err);
            }
        } else if done {
            let _ = writeln!(err, "  Downloaded {progress}");
        }
        let _ = err.flush();
    }

    fn info(&self, msg: &str) {
        println!("  {} {}", self.theme.icons.info, msg);
    }

    fn success(&self, msg: &str) {
        println!(
            "  {} {}",
            self.theme.icons.success.with(self.theme.colors.success),
            msg
        );
    }

    fn warning(&self, msg: &str) {
        eprintln!(
            "  {} {}",
            self.theme.icons.warning.with(self.theme.colors.warning),
            msg.with(self.theme.colors.warning)
        );
    }

    fn error(&self, msg: &str) {
        eprintln!(
            "{} {}",
            self.theme.icons.error.with(self.theme.colors.error),
            msg.with(self.theme.colors.error)
        );
    }

    fn summary(&self, detail: &str, elapsed_secs: f64) {
        println!("{}", "─".repeat(self.theme.rule_width).with(self.theme.colors.secondary));
        println!();
        let msg = format!("{detail} built in {elapsed_secs:.1}s");
        println!(
            "{} {}",
            self.theme.icons.success.with(self.theme.colors.success),
            msg.with(self.theme.colors.success)
        );
    }
}
