//! Collaborator clients: the Cronometer source and the InfluxDB store.
//!
//! Both are thin, synchronous HTTP wrappers. The ingest pipeline never sees
//! them; it only consumes the CSV text the source returns and produces the
//! points the store writes.

pub mod cronometer;
pub mod influx;

pub use cronometer::*;
pub use influx::*;

use crate::error::AppError;

/// Read a required environment variable with a uniform error.
pub(crate) fn required_env(name: &str) -> Result<String, AppError> {
    std::env::var(name).map_err(|_| AppError::config(format!("Missing {name} in environment (.env).")))
}
