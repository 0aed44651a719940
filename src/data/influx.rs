//! InfluxDB 1.x store client.
//!
//! Two operations, both over the HTTP API:
//!
//! - `delete_range` — wildcard delete across the sync window (`/query`),
//!   which is what makes re-runs replace instead of accumulate
//! - `write` — one line-protocol batch per export at second precision
//!   (`/write`)
//!
//! No retry/backoff here; a failed call fails the run.

use chrono::SecondsFormat;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::data::required_env;
use crate::domain::{Point, SyncWindow};
use crate::error::AppError;
use crate::report::format_batch;

pub struct InfluxClient {
    client: Client,
    url: String,
    username: String,
    password: String,
    database: String,
}

/// Response envelope of the `/query` endpoint. Errors can appear at the top
/// level or nested per statement.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<QueryResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    error: Option<String>,
}

impl InfluxClient {
    /// Build a client from `INFLUXDB_URL`, `INFLUXDB_USERNAME`,
    /// `INFLUXDB_PASSWORD`, and `INFLUXDB_DATABASE` (`.env` supported).
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let url = required_env("INFLUXDB_URL")?;
        let username = required_env("INFLUXDB_USERNAME")?;
        let password = required_env("INFLUXDB_PASSWORD")?;
        let database = required_env("INFLUXDB_DATABASE")?;

        Ok(Self {
            client: Client::new(),
            url: url.trim_end_matches('/').to_string(),
            username,
            password,
            database,
        })
    }

    /// Delete every point in the window across all measurements.
    pub fn delete_range(&self, window: &SyncWindow) -> Result<(), AppError> {
        let query = format!(
            "DELETE FROM /./ WHERE time >= '{}' AND time <= '{}'",
            window.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            window.end.to_rfc3339_opts(SecondsFormat::Secs, true),
        );

        let resp = self
            .client
            .post(format!("{}/query", self.url))
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("db", self.database.as_str()), ("q", query.as_str())])
            .send()
            .map_err(|e| AppError::network(format!("Store delete failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::network(format!(
                "Store delete failed with status {}.",
                resp.status()
            )));
        }

        let body: QueryResponse = resp
            .json()
            .map_err(|e| AppError::network(format!("Failed to parse store delete response: {e}")))?;
        if let Some(error) = body.error {
            return Err(AppError::network(format!("Store delete rejected: {error}")));
        }
        for result in body.results {
            if let Some(error) = result.error {
                return Err(AppError::network(format!("Store delete rejected: {error}")));
            }
        }

        Ok(())
    }

    /// Write one batch of points at second precision. An empty batch is a
    /// no-op.
    pub fn write(&self, points: &[Point]) -> Result<(), AppError> {
        if points.is_empty() {
            return Ok(());
        }

        let resp = self
            .client
            .post(format!("{}/write", self.url))
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("db", self.database.as_str()), ("precision", "s")])
            .body(format_batch(points))
            .send()
            .map_err(|e| AppError::network(format!("Store write failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(AppError::network(format!(
                "Store write failed with status {status}: {body}"
            )));
        }

        Ok(())
    }
}
