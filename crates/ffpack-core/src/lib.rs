//! Core library for ffpack.
//!
//! Builds a minimal, statically linked FFmpeg for macOS: fetch the source
//! release, build it once per architecture, merge the slices with `lipo`,
//! optionally sign, then publish into the app's resource directory.
//!
//! External tools are driven through the [`CommandRunner`] seam so the
//! sequencing can be tested without a toolchain.

pub mod builder;
pub mod combine;
pub mod config;
pub mod error;
pub mod io;
pub mod paths;
pub mod pipeline;
pub mod publish;
pub mod reporter;
pub mod runner;
pub mod sign;
pub mod verify;

pub use config::BuildConfig;
pub use error::{MergeError, PipelineError};
pub use paths::Layout;
pub use pipeline::{Pipeline, PipelineReport};
pub use reporter::{NullReporter, Reporter};
pub use runner::{CommandRunner, Invocation, Outcome, SystemRunner};

/// User Agent string for source downloads
pub const USER_AGENT: &str = concat!("ffpack/", env!("CARGO_PKG_VERSION"));
