//! Input/output helpers.
//!
//! - export CSV ingest → measurement points (`ingest`)
//! - audit dump sinks (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
