use std::time::Duration;

use anyhow::{Result, anyhow};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::analytics::window::EmployeeAttendanceWindow;

pub const ANALYSIS_UNAVAILABLE: &str = "analysis unavailable";

/// Client for the optional external analysis service.
#[derive(Clone)]
pub struct AnalyticsClient {
    http: reqwest::Client,
    endpoint: String,
}

impl AnalyticsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/analyze_attendance", base_url.trim_end_matches('/')),
        })
    }

    /// Never fails: any transport or payload problem becomes `{"error": "analysis unavailable"}`.
    pub async fn analyze(&self, windows: &[EmployeeAttendanceWindow]) -> Value {
        match self.try_analyze(windows).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, endpoint = %self.endpoint, "External analysis failed");
                unavailable()
            }
        }
    }

    async fn try_analyze(&self, windows: &[EmployeeAttendanceWindow]) -> Result<Value> {
        debug!(employees = windows.len(), endpoint = %self.endpoint, "Requesting external analysis");

        let payload: Value = self
            .http
            .post(&self.endpoint)
            .json(windows)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !payload.is_object() {
            return Err(anyhow!("analysis payload is not a JSON object"));
        }

        Ok(payload)
    }
}

pub fn unavailable() -> Value {
    json!({ "error": ANALYSIS_UNAVAILABLE })
}
