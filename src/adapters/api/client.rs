//! Marketplace HTTP Client - Shared REST Wrapper
//!
//! Wraps reqwest with a fixed request timeout, an optional API-key
//! header, and a bounded retry on transient upstream errors. The sync
//! core never retries; whatever survives this client propagates to the
//! orchestrator's per-mode failure policy.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Error surface of a marketplace request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("retries exhausted")]
    RetriesExhausted,
}

/// Configuration for one marketplace's REST client.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL, no trailing slash.
    pub base_url: String,
    /// Value for the `X-API-KEY` header, if the marketplace requires one.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum retries on 429/5xx or transport errors.
    pub max_retries: u32,
    /// Base delay between retries (exponential backoff).
    pub retry_base_delay: Duration,
}

impl ApiClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            timeout,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(200),
        }
    }
}

/// HTTP client shared by the marketplace feeds.
pub struct MarketplaceClient {
    http: Client,
    config: ApiClientConfig,
}

impl MarketplaceClient {
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self { http, config })
    }

    /// GET `path_and_query` under the base URL and decode the JSON body.
    pub async fn get_json(&self, path_and_query: &str) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.config.base_url, path_and_query);
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = self.config.retry_base_delay * 2u32.pow(attempt - 1);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying request");
                sleep(delay).await;
            }

            let mut request = self.http.get(&url);
            if let Some(key) = &self.config.api_key {
                request = request.header("X-API-KEY", key);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response.json::<Value>().await?);
                    }

                    let body = response.text().await.unwrap_or_default();
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        warn!(status = %status, "transient upstream error, retrying");
                        last_error = Some(ApiError::Status { status, body });
                        continue;
                    }
                    return Err(ApiError::Status { status, body });
                }
                Err(e) => {
                    warn!(error = %e, attempt, "request failed");
                    last_error = Some(ApiError::Transport(e));
                    continue;
                }
            }
        }

        Err(last_error.unwrap_or(ApiError::RetriesExhausted))
    }
}
