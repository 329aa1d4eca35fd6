//! HTTP contract with the remote traffic-generation controller.
//!
//! The controller speaks plain JSON over HTTP: `POST /api/start`,
//! `POST /api/stop`, `GET /api/stats`, plus a `GET /health` probe.
//! The [`ControlApi`] trait is the seam the campaign controller is
//! written against so the lifecycle logic can be exercised without a
//! live endpoint.

use crate::model::{CampaignConfig, TelemetrySnapshot};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Failure modes of a controller request.
///
/// `Rejected` is the remote explicitly refusing the request (non-2xx with
/// an error body); `Transport` covers delivery and decoding failures.
/// Which of the two blocks the operator depends on the operation: start
/// and stop surface both, stats polling treats everything as transient.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("controller rejected request: {0}")]
    Rejected(String),
    #[error("request failed: {0:#}")]
    Transport(anyhow::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.into())
    }
}

impl ApiError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, ApiError::Rejected(_))
    }
}

/// Transport seam for the campaign controller.
///
/// Futures are `Send` so the poll task can run the stats fetch on a
/// spawned tokio task.
pub trait ControlApi: Send + Sync + 'static {
    fn start_campaign(
        &self,
        config: &CampaignConfig,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn stop_campaign(&self) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn fetch_stats(&self) -> impl Future<Output = Result<TelemetrySnapshot, ApiError>> + Send;
}

/// Error body the controller attaches to a rejected start.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// reqwest-backed [`ControlApi`] implementation.
pub struct HttpControlApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpControlApi {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!(
                "traffic-campaign-cli/{}",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(request_timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-2xx response into `Rejected`, surfacing the remote
    /// `{error}` body verbatim when it parses.
    async fn reject(resp: reqwest::Response) -> ApiError {
        let status = resp.status();
        match resp.json::<ErrorBody>().await {
            Ok(body) => ApiError::Rejected(body.error),
            Err(_) => ApiError::Rejected(format!("HTTP {status}")),
        }
    }

    /// Probe `GET /health`; Ok when the controller reports healthy.
    pub async fn check_health(&self) -> Result<(), ApiError> {
        let resp = self.http.get(self.url("/health")).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Self::reject(resp).await)
        }
    }
}

impl ControlApi for HttpControlApi {
    async fn start_campaign(&self, config: &CampaignConfig) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(self.url("/api/start"))
            .json(config)
            .send()
            .await?;
        if resp.status().is_success() {
            // 2xx is acceptance; no further body contract.
            Ok(())
        } else {
            Err(Self::reject(resp).await)
        }
    }

    async fn stop_campaign(&self) -> Result<(), ApiError> {
        let resp = self.http.post(self.url("/api/stop")).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Self::reject(resp).await)
        }
    }

    async fn fetch_stats(&self) -> Result<TelemetrySnapshot, ApiError> {
        let resp = self
            .http
            .get(self.url("/api/stats"))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json::<TelemetrySnapshot>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let api = HttpControlApi::new("http://localhost:5004/", Duration::from_secs(5)).unwrap();
        assert_eq!(api.url("/api/stats"), "http://localhost:5004/api/stats");
    }

    #[test]
    fn rejection_is_distinguished_from_transport() {
        let err = ApiError::Rejected("Traffic already running".into());
        assert!(err.is_rejection());
        assert_eq!(
            err.to_string(),
            "controller rejected request: Traffic already running"
        );
    }
}
