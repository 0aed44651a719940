//! Point formatting.
//!
//! We keep formatting code in one place so:
//! - the store writer and the formatted dumps agree byte-for-byte
//! - output changes are localized (important for future snapshot tests)
//!
//! Points render as InfluxDB line protocol at second precision:
//!
//! `<measurement>,Metric=<m>,Unit=<u>,Source=<s> Amount=<v> <epoch-seconds>`

use crate::domain::{Point, SyncWindow};

/// Render one point as a line-protocol line.
pub fn format_line(point: &Point) -> String {
    format!(
        "{},Metric={},Unit={},Source={} Amount={} {}",
        point.measurement.name(),
        escape_tag(&point.metric),
        escape_tag(&point.unit),
        point.source.label(),
        point.amount,
        point.timestamp.and_utc().timestamp(),
    )
}

/// Render an ordered point sequence as a line-protocol batch body.
pub fn format_batch(points: &[Point]) -> String {
    points.iter().map(format_line).collect::<Vec<_>>().join("\n")
}

/// Format the post-run summary printed to the terminal.
pub fn format_sync_summary(
    window: &SyncWindow,
    biometrics: usize,
    nutrition: usize,
    written: bool,
) -> String {
    let mut out = String::new();

    out.push_str("=== cronosync - Cronometer to InfluxDB sync ===\n");
    out.push_str(&format!(
        "Window: {} .. {}\n",
        window.start.format("%Y-%m-%dT%H:%M:%SZ"),
        window.end.format("%Y-%m-%dT%H:%M:%SZ"),
    ));
    out.push_str(&format!("Points: biometrics={biometrics} | nutrition={nutrition}\n"));
    out.push_str(if written {
        "Store: written\n"
    } else {
        "Store: skipped (dry run)\n"
    });

    out
}

/// Escape a tag value per line protocol: commas, equals signs, and spaces
/// must be backslash-escaped (metric names routinely contain spaces).
fn escape_tag(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
