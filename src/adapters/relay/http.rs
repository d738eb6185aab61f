//! HTTP Relay Queue
//!
//! POSTs each page's envelope batch to the relay service as one JSON
//! body. The `delayed` flag travels with the batch so the relay can
//! route rows that still need asynchronous reconciliation.

use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::domain::order::OrderEnvelope;
use crate::ports::relay::RelayQueue;

#[derive(Clone)]
pub struct HttpRelayQueue {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpRelayQueue {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build relay HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl RelayQueue for HttpRelayQueue {
    async fn enqueue(&self, orders: &[OrderEnvelope], delayed: bool) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "orders": orders,
            "delayed": delayed,
        });

        let mut request = self
            .http
            .post(format!("{}/orders", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-KEY", key);
        }

        let response = request.send().await.context("relay enqueue request failed")?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            bail!("relay rejected batch ({status}): {detail}");
        }

        debug!(count = orders.len(), delayed, "relayed order batch");
        Ok(())
    }
}
