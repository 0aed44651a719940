//! Audit dump sinks.
//!
//! Each export run can be mirrored to a dump directory for inspection:
//!
//! - `raw_<kind>.csv` — the source payload exactly as fetched
//! - `formatted_<kind>.csv` — one line-protocol line per point, identical to
//!   the batch handed to the store writer

use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::{ExportKind, Point};
use crate::error::AppError;
use crate::report::format_line;

/// Mirror the raw export payload. Returns the written path.
pub fn write_raw_dump(dir: &Path, kind: ExportKind, raw: &str) -> Result<PathBuf, AppError> {
    let path = dump_path(dir, "raw", kind)?;
    fs::write(&path, raw)
        .map_err(|e| AppError::config(format!("Failed to write raw dump '{}': {e}", path.display())))?;
    Ok(path)
}

/// Mirror the formatted point sequence, one line per point. Returns the
/// written path.
pub fn write_points_dump(dir: &Path, kind: ExportKind, points: &[Point]) -> Result<PathBuf, AppError> {
    let path = dump_path(dir, "formatted", kind)?;
    let mut file = File::create(&path).map_err(|e| {
        AppError::config(format!("Failed to create formatted dump '{}': {e}", path.display()))
    })?;

    for point in points {
        writeln!(file, "{}", format_line(point)).map_err(|e| {
            AppError::config(format!("Failed to write formatted dump '{}': {e}", path.display()))
        })?;
    }

    Ok(path)
}

fn dump_path(dir: &Path, prefix: &str, kind: ExportKind) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dir).map_err(|e| {
        AppError::config(format!("Failed to create dump directory '{}': {e}", dir.display()))
    })?;
    Ok(dir.join(format!("{prefix}_{}.csv", kind.file_stem())))
}
