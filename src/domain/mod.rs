//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the export catalogue (`ExportKind`, `Measurement`)
//! - normalized measurement points (`Point`, `Source`)
//! - the bounded window a run covers (`SyncWindow`)

pub mod types;

pub use types::*;
