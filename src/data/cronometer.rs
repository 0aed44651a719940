//! Cronometer export fetch.
//!
//! Thin session wrapper around the web export endpoints: log in once, then
//! pull CSV exports bounded by the sync window. Deliberately minimal per the
//! collaborator contract — no retries, no pagination, no session refresh.

use reqwest::blocking::Client;

use crate::data::required_env;
use crate::domain::{ExportKind, SyncWindow};
use crate::error::AppError;

const BASE_URL: &str = "https://cronometer.com";
const DATE_FMT: &str = "%Y-%m-%d";

pub struct CronometerClient {
    client: Client,
}

impl CronometerClient {
    /// Build a logged-in client from `CRONOMETER_USERNAME` /
    /// `CRONOMETER_PASSWORD` in the environment (`.env` supported).
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let username = required_env("CRONOMETER_USERNAME")?;
        let password = required_env("CRONOMETER_PASSWORD")?;

        // The session lives in the cookie store for the lifetime of the run.
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| AppError::network(format!("Failed to build HTTP client: {e}")))?;

        let this = Self { client };
        this.login(&username, &password)?;
        Ok(this)
    }

    fn login(&self, username: &str, password: &str) -> Result<(), AppError> {
        // The login form carries an anti-CSRF token we must echo back.
        let resp = self
            .client
            .get(format!("{BASE_URL}/login/"))
            .send()
            .map_err(|e| AppError::network(format!("Failed to load login page: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::network(format!(
                "Login page request failed with status {}.",
                resp.status()
            )));
        }
        let page = resp
            .text()
            .map_err(|e| AppError::network(format!("Failed to read login page: {e}")))?;
        let anticsrf = extract_anticsrf(&page)
            .ok_or_else(|| AppError::network("Login page did not contain an anti-CSRF token."))?;

        let resp = self
            .client
            .post(format!("{BASE_URL}/login"))
            .form(&[
                ("anticsrf", anticsrf.as_str()),
                ("username", username),
                ("password", password),
            ])
            .send()
            .map_err(|e| AppError::network(format!("Login request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::network(format!(
                "Login failed with status {}.",
                resp.status()
            )));
        }

        let body = resp
            .text()
            .map_err(|e| AppError::network(format!("Failed to read login response: {e}")))?;
        if body.starts_with("ERROR") {
            return Err(AppError::network("Cronometer login rejected (check credentials)."));
        }

        Ok(())
    }

    /// Fetch one export's CSV payload for the window.
    pub fn export(&self, kind: ExportKind, window: &SyncWindow) -> Result<String, AppError> {
        let start = window.start.format(DATE_FMT).to_string();
        let end = window.end.format(DATE_FMT).to_string();

        let resp = self
            .client
            .get(format!("{BASE_URL}/export"))
            .query(&[
                ("generate", kind.generate_param()),
                ("start", start.as_str()),
                ("end", end.as_str()),
            ])
            .send()
            .map_err(|e| {
                AppError::network(format!("{} export request failed: {e}", kind.display_name()))
            })?;
        if !resp.status().is_success() {
            return Err(AppError::network(format!(
                "{} export failed with status {}.",
                kind.display_name(),
                resp.status()
            )));
        }

        resp.text()
            .map_err(|e| AppError::network(format!("Failed to read {} export: {e}", kind.display_name())))
    }
}

/// Pull the `anticsrf` hidden-input value out of the login page HTML.
fn extract_anticsrf(page: &str) -> Option<String> {
    let marker = "name=\"anticsrf\"";
    let at = page.find(marker)?;
    let rest = &page[at + marker.len()..];
    let value_start = rest.find("value=\"")? + "value=\"".len();
    let rest = &rest[value_start..];
    let value_end = rest.find('"')?;
    Some(rest[..value_end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anticsrf_token_is_extracted_from_login_form() {
        let page = r#"<form method="post" action="login">
            <input type="hidden" name="anticsrf" value="a1b2c3d4">
            <input type="text" name="username">
        </form>"#;
        assert_eq!(extract_anticsrf(page).as_deref(), Some("a1b2c3d4"));
    }

    #[test]
    fn missing_token_yields_none() {
        assert_eq!(extract_anticsrf("<html><body>maintenance</body></html>"), None);
    }
}
