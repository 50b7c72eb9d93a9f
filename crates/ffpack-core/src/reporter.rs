//! Reporter trait for dependency injection
//!
//! This trait allows the pipeline to report progress and status without
//! being coupled to a specific terminal implementation.

/// Sink for user-facing progress messages.
pub trait Reporter: Send + Sync {
    /// Indicates a new phase has started (e.g. "Fetching", "Building arm64").
    fn section(&self, title: &str);

    /// Updates the progress of the source download.
    fn downloading(&self, current: u64, total: Option<u64>);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Display a final summary with timing.
    fn summary(&self, detail: &str, elapsed_secs: f64);
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn downloading(&self, _: u64, _: Option<u64>) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn summary(&self, _: &str, _: f64) {}
}
