use serde::Deserialize;
use tracing::debug;

use crate::error::ConnectError;

/// Body of the agent server's health endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Probe the health endpoint.
pub async fn check_health(
    client: &reqwest::Client,
    url: &str,
) -> Result<HealthStatus, ConnectError> {
    debug!(%url, "checking agent server health");
    let response = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| ConnectError::from_reqwest(url, e))?;
    response
        .json::<HealthStatus>()
        .await
        .map_err(|e| ConnectError::from_reqwest(url, e))
}
