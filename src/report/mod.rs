//! Reporting utilities: line-protocol rendering and the terminal run summary.

pub mod format;

pub use format::*;
