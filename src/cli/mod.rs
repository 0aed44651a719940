//! Command-line parsing for the Cronometer sync tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline code. Everything else (credentials, store coordinates) comes from
//! the environment, not flags.

use std::path::PathBuf;

use clap::Parser;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "cronosync",
    version,
    about = "Sync recent Cronometer biometrics and daily nutrition into InfluxDB"
)]
pub struct Cli {
    /// How many days back from now the sync window starts (midnight-aligned).
    #[arg(long, default_value_t = 7)]
    pub days: u32,

    /// Mirror raw exports and formatted points into this directory.
    #[arg(long, value_name = "DIR")]
    pub dump_dir: Option<PathBuf>,

    /// Fetch and transform, but skip the store delete and writes.
    #[arg(long)]
    pub dry_run: bool,
}
