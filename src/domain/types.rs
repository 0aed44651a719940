//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - produced by the ingest pipeline without any store concerns
//! - rendered to line protocol for both the writer and the audit dumps
//! - compared structurally in tests (runs are deterministic)

use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Utc};

/// Metric names carrying this suffix were synced into Cronometer from a
/// device rather than typed in by hand.
pub const HEALTH_CONNECT_SUFFIX: &str = " (Health Connect)";

/// Target measurement a point is written under. Fixed per export kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measurement {
    Biometrics,
    Nutrition,
}

impl Measurement {
    /// Measurement name as written to the store.
    pub fn name(self) -> &'static str {
        match self {
            Measurement::Biometrics => "biometrics",
            Measurement::Nutrition => "nutrition",
        }
    }
}

/// How a reading entered Cronometer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Synced from a device via Health Connect.
    Automatic,
    /// Entered by hand.
    Manual,
}

impl Source {
    /// Tag value as written to the store.
    pub fn label(self) -> &'static str {
        match self {
            Source::Automatic => "automatic",
            Source::Manual => "manual",
        }
    }

    /// Classify a metric name by the Health Connect suffix.
    ///
    /// Applied uniformly to every metric regardless of export kind; nutrition
    /// metric names come out of the header interpreter already split on
    /// `" ("`, so in practice only biometric names can carry the suffix.
    pub fn for_metric(metric: &str) -> Self {
        if metric.ends_with(HEALTH_CONNECT_SUFFIX) {
            Source::Automatic
        } else {
            Source::Manual
        }
    }
}

/// Which Cronometer export to pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Biometrics,
    DailyNutrition,
}

impl ExportKind {
    /// Measurement this export's points are written under.
    pub fn measurement(self) -> Measurement {
        match self {
            ExportKind::Biometrics => Measurement::Biometrics,
            ExportKind::DailyNutrition => Measurement::Nutrition,
        }
    }

    /// Value of the `generate` query parameter on the export endpoint.
    pub fn generate_param(self) -> &'static str {
        match self {
            ExportKind::Biometrics => "biometrics",
            ExportKind::DailyNutrition => "dailySummary",
        }
    }

    /// File stem used for audit dumps (`raw_<stem>.csv`, `formatted_<stem>.csv`).
    pub fn file_stem(self) -> &'static str {
        match self {
            ExportKind::Biometrics => "biometrics",
            ExportKind::DailyNutrition => "daily_nutrition",
        }
    }

    /// Human-readable label for logs and the run summary.
    pub fn display_name(self) -> &'static str {
        match self {
            ExportKind::Biometrics => "biometrics",
            ExportKind::DailyNutrition => "daily nutrition",
        }
    }
}

/// A normalized measurement point: one numeric field, three tags, one
/// second-precision timestamp.
///
/// The `metric` tag is never empty (the point builder refuses to construct
/// such a point), and the tag set is fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: Measurement,
    pub metric: String,
    pub unit: String,
    pub source: Source,
    pub amount: f64,
    pub timestamp: NaiveDateTime,
}

/// Bounded recent window a run covers.
///
/// The same window bounds the source export request and the store's
/// pre-write range delete, which is what makes re-runs idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    /// Window from midnight UTC `days` days ago until now.
    pub fn recent_days(days: u32) -> Self {
        let end = Utc::now();
        let start = (end - Duration::days(i64::from(days)))
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc();
        Self { start, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_connect_suffix_is_automatic() {
        assert_eq!(Source::for_metric("Weight (Health Connect)"), Source::Automatic);
        assert_eq!(Source::for_metric("Weight"), Source::Manual);
        // The suffix must be terminal, not merely present.
        assert_eq!(Source::for_metric("Weight (Health Connect) avg"), Source::Manual);
    }

    #[test]
    fn recent_days_starts_at_midnight() {
        let window = SyncWindow::recent_days(7);
        assert_eq!(window.start.time(), NaiveTime::MIN);
        assert!(window.start < window.end);
        // At least the full 7 days are covered.
        assert!((window.end - window.start) >= Duration::days(7));
    }

    #[test]
    fn export_kinds_map_to_measurements() {
        assert_eq!(ExportKind::Biometrics.measurement().name(), "biometrics");
        assert_eq!(ExportKind::DailyNutrition.measurement().name(), "nutrition");
    }
}
