//! ffpack - minimal static FFmpeg for macOS

use std::process::ExitCode;

use clap::Parser;
use ffpack_core::Reporter;
use tracing_subscriber::EnvFilter;

use ffpack_cli::ui::ConsoleReporter;
use ffpack_cli::{Cli, error_message, exit_code, run};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Argument errors exit here (code 2) before anything touches the disk.
    let config = Cli::parse().into_config();
    let reporter = ConsoleReporter::new();

    match run(&config, &reporter).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            reporter.error(&error_message(&err));
            ExitCode::from(exit_code(&err))
        }
    }
}
