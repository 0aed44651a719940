//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - initializes logging
//! - runs the sync pipeline
//! - prints the run summary

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `cronosync` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    init_logging();

    let outcome = pipeline::run_sync(&cli)?;

    println!(
        "{}",
        crate::report::format_sync_summary(
            &outcome.window,
            outcome.biometric_points,
            outcome.nutrition_points,
            outcome.written,
        )
    );

    Ok(())
}

/// Console logging; respects `RUST_LOG`, defaults to info for this crate.
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cronosync=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
