//! Export ingest: the record-to-point transformation pipeline.
//!
//! Both export flavors run through the same four stages:
//!
//! 1. **header interpretation** — metric names and units; biometric columns
//!    are fixed and looked up by name, nutrition headers carry units in
//!    parenthetical suffixes
//! 2. **row normalization** — keyed records, sentinel skipping
//! 3. **metric splitting** — compound cells fan out, numeric parsing
//! 4. **point building** — tags and resolved timestamps
//!
//! Design goals:
//! - **Fail fast**: the first malformed header, row, or timestamp aborts the
//!   run; a partially-valid point list is never returned alongside an error
//! - **Deterministic output**: rows are processed in source order, so
//!   identical input yields an identical point sequence
//! - **Separation of concerns**: no store or network code here

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::StringRecord;

use crate::domain::{ExportKind, Measurement, Point, Source};
use crate::error::AppError;

const BLOOD_PRESSURE_METRIC: &str = "Blood Pressure";
const SYSTOLIC_METRIC: &str = "Systolic Blood Pressure";
const DIASTOLIC_METRIC: &str = "Diastolic Blood Pressure";

/// First-cell value marking the daily nutrition footer row, a formatting
/// artifact of the export rather than a data row.
const SENTINEL_COMPLETED: &str = "Completed";

const DAY_FMT: &str = "%Y-%m-%d";

/// 12-hour clock first: readings entered in the web UI carry `3:04 PM`
/// times, device syncs carry 24-hour `15:04:05`. First successful parse wins.
const DAY_TIME_FMTS: [&str; 2] = ["%Y-%m-%d %I:%M %p", "%Y-%m-%d %H:%M:%S"];

/// Metric name + unit derived from one header label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: String,
    pub unit: String,
}

/// Biometric row after normalization: one reading per row.
#[derive(Debug, Clone)]
struct BiometricRecord {
    day: String,
    time: Option<String>,
    metric: String,
    unit: String,
    amount: String,
}

/// Daily nutrition row after normalization: one day per row, cells
/// index-aligned with the header descriptors.
#[derive(Debug, Clone)]
struct NutritionRecord {
    day: String,
    cells: Vec<String>,
}

/// Transform one export payload into its ordered point sequence.
pub fn export_points(kind: ExportKind, raw: &str) -> Result<Vec<Point>, AppError> {
    match kind {
        ExportKind::Biometrics => biometric_points(raw),
        ExportKind::DailyNutrition => nutrition_points(raw),
    }
}

/// Transform a biometrics export into points.
///
/// Each row is one reading (`Day`, optional `Time`, `Metric`, `Amount`,
/// `Unit`). Blood pressure rows fan out into systolic/diastolic points.
pub fn biometric_points(raw: &str) -> Result<Vec<Point>, AppError> {
    let mut reader = csv_reader(raw);

    let headers = reader
        .headers()
        .map_err(|e| AppError::data(format!("Failed to read biometrics header: {e}")))?
        .clone();
    if headers.is_empty() {
        return Err(AppError::data("Biometrics export has no header line."));
    }

    let header_map = build_header_map(&headers);
    for name in ["day", "metric", "amount"] {
        if !header_map.contains_key(name) {
            return Err(AppError::data(format!(
                "Biometrics export is missing required column: `{name}`"
            )));
        }
    }

    let mut points = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header and CSV lines are 1-based.
        let line = idx + 2;
        let record = result
            .map_err(|e| AppError::data(format!("Failed to read biometrics row (line {line}): {e}")))?;

        let row = normalize_biometric_row(&record, &header_map, line)?;
        let timestamp = resolve_timestamp(&row.day, row.time.as_deref())?;
        split_metric(
            ExportKind::Biometrics.measurement(),
            &row.metric,
            &row.unit,
            &row.amount,
            timestamp,
            &mut points,
        )?;
    }

    Ok(points)
}

/// Transform a daily nutrition export into points.
///
/// Each row is one day; every non-empty cell (besides `Date`/`Completed`)
/// becomes a point timestamped at that day's midnight. Empty cells are
/// metrics that were not logged that day and are skipped without error.
pub fn nutrition_points(raw: &str) -> Result<Vec<Point>, AppError> {
    let mut reader = csv_reader(raw);

    let headers = reader
        .headers()
        .map_err(|e| AppError::data(format!("Failed to read daily nutrition header: {e}")))?
        .clone();
    if headers.is_empty() {
        return Err(AppError::data("Daily nutrition export has no header line."));
    }

    let descriptors = interpret_nutrition_headers(&headers);
    let day_idx = descriptors
        .iter()
        .position(|d| d.name == "Date")
        .ok_or_else(|| AppError::data("Daily nutrition export is missing required column: `Date`"))?;

    let mut points = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| {
            AppError::data(format!("Failed to read daily nutrition row (line {line}): {e}"))
        })?;

        if record.get(0) == Some(SENTINEL_COMPLETED) {
            continue;
        }

        let row = normalize_nutrition_row(&record, day_idx, line)?;
        let timestamp = resolve_timestamp(&row.day, None)?;

        for (descriptor, value) in descriptors.iter().zip(row.cells.iter()) {
            if descriptor.name == "Date" || descriptor.name == "Completed" {
                continue;
            }
            if value.is_empty() {
                continue;
            }
            split_metric(
                ExportKind::DailyNutrition.measurement(),
                &descriptor.name,
                &descriptor.unit,
                value,
                timestamp,
                &mut points,
            )?;
        }
    }

    Ok(points)
}

/// Derive metric descriptors from nutrition header labels.
///
/// Each label splits on `" ("`: the part before is the metric name, the part
/// between the parentheses (if any) is the unit. `"Energy (kcal)"` becomes
/// `Energy` / `kcal`; a label with no parenthetical keeps an empty unit.
pub fn interpret_nutrition_headers(headers: &StringRecord) -> Vec<MetricDescriptor> {
    headers
        .iter()
        .map(|label| {
            let label = label.trim_start_matches('\u{feff}');
            let parts: Vec<&str> = label.split(" (").collect();
            let name = parts[0].to_string();
            let unit = parts
                .get(1)
                .map(|u| u.strip_suffix(')').unwrap_or(u))
                .unwrap_or("")
                .to_string();
            MetricDescriptor { name, unit }
        })
        .collect()
}

fn csv_reader(raw: &str) -> csv::Reader<&[u8]> {
    // Strict field counts: a row whose length does not match the header is a
    // malformed row and fails the run.
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes())
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Some exports prefix the first header with a UTF-8 BOM; without
    // stripping it, schema validation reports the column as missing.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn normalize_biometric_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    line: usize,
) -> Result<BiometricRecord, AppError> {
    let day = get_required(record, header_map, "day", line)?.to_string();
    let metric = get_required(record, header_map, "metric", line)?.to_string();
    let amount = get_required(record, header_map, "amount", line)?.to_string();
    let unit = get_optional(record, header_map, "unit").unwrap_or_default().to_string();
    let time = get_optional(record, header_map, "time").map(str::to_string);

    Ok(BiometricRecord {
        day,
        time,
        metric,
        unit,
        amount,
    })
}

fn normalize_nutrition_row(
    record: &StringRecord,
    day_idx: usize,
    line: usize,
) -> Result<NutritionRecord, AppError> {
    let day = record
        .get(day_idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::data(format!("Missing `Date` value (line {line}).")))?
        .to_string();

    Ok(NutritionRecord {
        day,
        cells: record.iter().map(str::to_string).collect(),
    })
}

/// Apply metric-specific decomposition and emit points for one cell.
///
/// Blood pressure is the one compound metric: its cell fans out into two
/// points sharing the row's unit and timestamp. Everything else is a single
/// scalar point.
fn split_metric(
    measurement: Measurement,
    metric: &str,
    unit: &str,
    raw_value: &str,
    timestamp: NaiveDateTime,
    points: &mut Vec<Point>,
) -> Result<(), AppError> {
    if metric == BLOOD_PRESSURE_METRIC {
        let (systolic, diastolic) = split_blood_pressure(raw_value)?;
        points.push(build_point(measurement, SYSTOLIC_METRIC, unit, systolic, timestamp)?);
        points.push(build_point(measurement, DIASTOLIC_METRIC, unit, diastolic, timestamp)?);
    } else {
        let amount = parse_amount(metric, raw_value)?;
        points.push(build_point(measurement, metric, unit, amount, timestamp)?);
    }
    Ok(())
}

/// Split a `"<systolic>/<diastolic>"` cell into two rounded readings.
fn split_blood_pressure(raw: &str) -> Result<(f64, f64), AppError> {
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != 2 {
        return Err(AppError::data(format!(
            "Invalid blood pressure '{raw}': expected `<systolic>/<diastolic>`."
        )));
    }

    let systolic = parse_pressure_side(parts[0], "systolic", raw)?;
    let diastolic = parse_pressure_side(parts[1], "diastolic", raw)?;
    Ok((systolic, diastolic))
}

fn parse_pressure_side(side: &str, which: &str, raw: &str) -> Result<f64, AppError> {
    let value = side
        .trim()
        .parse::<f64>()
        .map_err(|_| AppError::data(format!("Invalid {which} value in blood pressure '{raw}'.")))?;
    if !value.is_finite() {
        return Err(AppError::data(format!(
            "Non-finite {which} value in blood pressure '{raw}'."
        )));
    }
    // Half-away-from-zero, matching how the readings are displayed.
    Ok(value.round())
}

fn parse_amount(metric: &str, raw: &str) -> Result<f64, AppError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| AppError::data(format!("Invalid amount '{raw}' for metric `{metric}`.")))?;
    if !value.is_finite() {
        return Err(AppError::data(format!(
            "Non-finite amount '{raw}' for metric `{metric}`."
        )));
    }
    Ok(value)
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
    line: usize,
) -> Result<&'a str, AppError> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| AppError::data(format!("Missing required column: `{name}`")))?;
    record
        .get(*idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::data(format!("Missing required value `{name}` (line {line}).")))
}

fn get_optional<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).filter(|s| !s.is_empty())
}

/// Resolve a row timestamp from its `Day` and optional `Time` values.
///
/// A present, non-empty time contributes time-of-day; otherwise the day
/// alone means midnight. Whole-second precision throughout.
fn resolve_timestamp(day: &str, time: Option<&str>) -> Result<NaiveDateTime, AppError> {
    match time {
        Some(t) if !t.is_empty() => parse_day_time(day, t),
        _ => {
            let date = NaiveDate::parse_from_str(day, DAY_FMT)
                .map_err(|_| AppError::data(format!("Invalid day '{day}'. Expected YYYY-MM-DD.")))?;
            Ok(date.and_time(NaiveTime::MIN))
        }
    }
}

fn parse_day_time(day: &str, time: &str) -> Result<NaiveDateTime, AppError> {
    let joined = format!("{day} {time}");
    for fmt in DAY_TIME_FMTS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(&joined, fmt) {
            return Ok(ts);
        }
    }
    Err(AppError::data(format!(
        "Invalid timestamp '{joined}'. Expected `YYYY-MM-DD h:MM AM/PM` or `YYYY-MM-DD HH:MM:SS`."
    )))
}

fn build_point(
    measurement: Measurement,
    metric: &str,
    unit: &str,
    amount: f64,
    timestamp: NaiveDateTime,
) -> Result<Point, AppError> {
    if metric.is_empty() {
        return Err(AppError::data("Refusing to build a point with an empty metric name."));
    }

    Ok(Point {
        measurement,
        metric: metric.to_string(),
        unit: unit.to_string(),
        source: Source::for_metric(metric),
        amount,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn biometric_scalar_row_builds_one_point() {
        let raw = "Day,Time,Metric,Amount,Unit\n2024-01-05,,Weight,80.5,kg\n";
        let points = biometric_points(raw).unwrap();

        assert_eq!(points.len(), 1);
        let p = &points[0];
        assert_eq!(p.measurement, Measurement::Biometrics);
        assert_eq!(p.metric, "Weight");
        assert_eq!(p.unit, "kg");
        assert_eq!(p.source, Source::Manual);
        assert_eq!(p.amount, 80.5);
        assert_eq!(p.timestamp, ts(2024, 1, 5, 0, 0, 0));
    }

    #[test]
    fn biometric_time_parses_12_hour_clock() {
        let raw = "Day,Time,Metric,Amount,Unit\n2024-01-05,3:04 PM,Weight,80.5,kg\n";
        let points = biometric_points(raw).unwrap();
        assert_eq!(points[0].timestamp, ts(2024, 1, 5, 15, 4, 0));
    }

    #[test]
    fn biometric_time_parses_24_hour_clock() {
        let raw = "Day,Time,Metric,Amount,Unit\n2024-01-05,15:04:05,Weight,80.5,kg\n";
        let points = biometric_points(raw).unwrap();
        assert_eq!(points[0].timestamp, ts(2024, 1, 5, 15, 4, 5));
    }

    #[test]
    fn biometric_unparseable_time_fails() {
        let raw = "Day,Time,Metric,Amount,Unit\n2024-01-05,quarter past,Weight,80.5,kg\n";
        assert!(biometric_points(raw).is_err());
    }

    #[test]
    fn biometric_export_without_time_column_is_midnight() {
        let raw = "Day,Metric,Amount,Unit\n2024-01-05,Weight,80.5,kg\n";
        let points = biometric_points(raw).unwrap();
        assert_eq!(points[0].timestamp, ts(2024, 1, 5, 0, 0, 0));
    }

    #[test]
    fn blood_pressure_fans_out_into_two_points() {
        let raw = "Day,Time,Metric,Amount,Unit\n2024-01-05,3:04 PM,Blood Pressure,118.6/79.4,mmHg\n";
        let points = biometric_points(raw).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].metric, "Systolic Blood Pressure");
        assert_eq!(points[0].amount, 119.0);
        assert_eq!(points[1].metric, "Diastolic Blood Pressure");
        assert_eq!(points[1].amount, 79.0);

        // Both points share the row's unit, timestamp, and source.
        for p in &points {
            assert_eq!(p.unit, "mmHg");
            assert_eq!(p.timestamp, ts(2024, 1, 5, 15, 4, 0));
            assert_eq!(p.source, Source::Manual);
        }
    }

    #[test]
    fn blood_pressure_accepts_padded_sides() {
        let raw = "Day,Time,Metric,Amount,Unit\n2024-01-05,,Blood Pressure, 120 / 80 ,mmHg\n";
        let points = biometric_points(raw).unwrap();
        assert_eq!(points[0].amount, 120.0);
        assert_eq!(points[1].amount, 80.0);
    }

    #[test]
    fn blood_pressure_malformed_fails_the_run() {
        for amount in ["120-80", "120/80/60", "120", "x/80", "120/"] {
            let raw = format!("Day,Time,Metric,Amount,Unit\n2024-01-05,,Blood Pressure,{amount},mmHg\n");
            assert!(biometric_points(&raw).is_err(), "expected failure for {amount:?}");
        }
    }

    #[test]
    fn biometric_empty_amount_fails_the_run() {
        let raw = "Day,Time,Metric,Amount,Unit\n2024-01-05,,Weight,,kg\n";
        assert!(biometric_points(raw).is_err());
    }

    #[test]
    fn biometric_unparseable_amount_fails_the_run() {
        let raw = "Day,Time,Metric,Amount,Unit\n2024-01-05,,Weight,heavy,kg\n";
        assert!(biometric_points(raw).is_err());
    }

    #[test]
    fn biometric_bad_day_fails_the_run() {
        let raw = "Day,Time,Metric,Amount,Unit\n01/05/2024,,Weight,80.5,kg\n";
        assert!(biometric_points(raw).is_err());
    }

    #[test]
    fn health_connect_metrics_are_tagged_automatic() {
        let raw = "Day,Time,Metric,Amount,Unit\n\
                   2024-01-05,,Resting Heart Rate (Health Connect),52,bpm\n\
                   2024-01-05,,Resting Heart Rate,54,bpm\n";
        let points = biometric_points(raw).unwrap();

        assert_eq!(points[0].source, Source::Automatic);
        // The metric tag keeps the suffix; only the source tag reflects it.
        assert_eq!(points[0].metric, "Resting Heart Rate (Health Connect)");
        assert_eq!(points[1].source, Source::Manual);
    }

    #[test]
    fn nutrition_headers_split_into_names_and_units() {
        let headers = StringRecord::from(vec!["Date", "Energy (kcal)", "Fiber (g)", "Completed"]);
        let descriptors = interpret_nutrition_headers(&headers);

        assert_eq!(descriptors[0], MetricDescriptor { name: "Date".into(), unit: "".into() });
        assert_eq!(descriptors[1], MetricDescriptor { name: "Energy".into(), unit: "kcal".into() });
        assert_eq!(descriptors[2], MetricDescriptor { name: "Fiber".into(), unit: "g".into() });
        assert_eq!(descriptors[3], MetricDescriptor { name: "Completed".into(), unit: "".into() });
    }

    #[test]
    fn nutrition_end_to_end() {
        let raw = "Date,Energy (kcal),Protein (g)\n2024-02-01,2000,150\n";
        let points = nutrition_points(raw).unwrap();

        assert_eq!(points.len(), 2);

        let energy = &points[0];
        assert_eq!(energy.measurement, Measurement::Nutrition);
        assert_eq!(energy.metric, "Energy");
        assert_eq!(energy.unit, "kcal");
        assert_eq!(energy.source, Source::Manual);
        assert_eq!(energy.amount, 2000.0);
        assert_eq!(energy.timestamp, ts(2024, 2, 1, 0, 0, 0));

        let protein = &points[1];
        assert_eq!(protein.metric, "Protein");
        assert_eq!(protein.unit, "g");
        assert_eq!(protein.amount, 150.0);
        assert_eq!(protein.timestamp, ts(2024, 2, 1, 0, 0, 0));
    }

    #[test]
    fn nutrition_sentinel_row_is_skipped() {
        let raw = "Date,Energy (kcal)\nCompleted,\n2024-02-01,2000\n";
        let points = nutrition_points(raw).unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].metric, "Energy");
    }

    #[test]
    fn nutrition_empty_cell_skips_that_metric_only() {
        let raw = "Date,Energy (kcal),Fiber (g),Protein (g)\n2024-02-01,2000,,150\n";
        let points = nutrition_points(raw).unwrap();

        let metrics: Vec<&str> = points.iter().map(|p| p.metric.as_str()).collect();
        assert_eq!(metrics, vec!["Energy", "Protein"]);
    }

    #[test]
    fn nutrition_unparseable_amount_fails_the_run() {
        let raw = "Date,Energy (kcal)\n2024-02-01,lots\n";
        assert!(nutrition_points(raw).is_err());
    }

    #[test]
    fn nutrition_without_date_column_fails() {
        let raw = "Energy (kcal),Protein (g)\n2000,150\n";
        assert!(nutrition_points(raw).is_err());
    }

    #[test]
    fn empty_payload_fails() {
        assert!(biometric_points("").is_err());
        assert!(nutrition_points("").is_err());
    }

    #[test]
    fn row_length_mismatch_fails() {
        let raw = "Date,Energy (kcal)\n2024-02-01,2000,999\n";
        assert!(nutrition_points(raw).is_err());
    }

    #[test]
    fn identical_input_yields_identical_points() {
        let raw = "Day,Time,Metric,Amount,Unit\n\
                   2024-01-05,3:04 PM,Blood Pressure,120/80,mmHg\n\
                   2024-01-06,,Weight,80.5,kg\n";
        let first = biometric_points(raw).unwrap();
        let second = biometric_points(raw).unwrap();
        assert_eq!(first, second);
    }
}
