//! Shared sync pipeline.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//!
//! window -> range delete -> per-export fetch -> transform -> dump -> write
//!
//! The CLI entry point then only handles presentation. Any error aborts the
//! run before the current export's batch reaches the store.

use std::path::Path;

use tracing::{debug, info};

use crate::cli::Cli;
use crate::data::{CronometerClient, InfluxClient};
use crate::domain::{ExportKind, SyncWindow};
use crate::error::AppError;
use crate::io::{export_points, write_points_dump, write_raw_dump};

/// Outcome of a completed sync run.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub window: SyncWindow,
    pub biometric_points: usize,
    pub nutrition_points: usize,
    pub written: bool,
}

/// Execute the full sync and report what was done.
pub fn run_sync(cli: &Cli) -> Result<SyncOutcome, AppError> {
    let window = SyncWindow::recent_days(cli.days);
    info!(start = %window.start, end = %window.end, "sync window resolved");

    let store = if cli.dry_run {
        None
    } else {
        Some(InfluxClient::from_env()?)
    };

    // Clear the window up front so a re-run replaces the previous points
    // instead of accumulating alongside them.
    if let Some(store) = &store {
        store.delete_range(&window)?;
        debug!("existing points deleted across the window");
    }

    let source = CronometerClient::from_env()?;

    let dump_dir = cli.dump_dir.as_deref();
    let biometric_points =
        sync_export(ExportKind::Biometrics, &window, &source, store.as_ref(), dump_dir)?;
    let nutrition_points =
        sync_export(ExportKind::DailyNutrition, &window, &source, store.as_ref(), dump_dir)?;

    Ok(SyncOutcome {
        window,
        biometric_points,
        nutrition_points,
        written: !cli.dry_run,
    })
}

/// Fetch, transform, optionally dump, and write one export. Returns the
/// number of points produced.
fn sync_export(
    kind: ExportKind,
    window: &SyncWindow,
    source: &CronometerClient,
    store: Option<&InfluxClient>,
    dump_dir: Option<&Path>,
) -> Result<usize, AppError> {
    let raw = source.export(kind, window)?;
    debug!(kind = kind.display_name(), bytes = raw.len(), "export fetched");

    if let Some(dir) = dump_dir {
        let path = write_raw_dump(dir, kind, &raw)?;
        debug!(path = %path.display(), "raw dump written");
    }

    let points = export_points(kind, &raw)?;
    info!(kind = kind.display_name(), points = points.len(), "export transformed");

    if let Some(dir) = dump_dir {
        let path = write_points_dump(dir, kind, &points)?;
        debug!(path = %path.display(), "formatted dump written");
    }

    if let Some(store) = store {
        store.write(&points)?;
        info!(kind = kind.display_name(), "batch written to store");
    }

    Ok(points.len())
}
