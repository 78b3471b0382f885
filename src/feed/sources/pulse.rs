//! Pulse aggregator REST client
//!
//! Single GET against `/api/query`, bounded by a request timeout.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::{FetchError, UpstreamSource};
use crate::config::UpstreamConfig;

pub const DEFAULT_UPSTREAM_URL: &str = "https://pulse.astro-btc.xyz/api/query";

#[derive(Debug, Clone)]
pub struct PulseClient {
    client: Client,
    url: String,
}

impl PulseClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: url.trim().to_string(),
        })
    }

    pub fn from_config(config: &UpstreamConfig) -> Result<Self> {
        Self::new(&config.url, Duration::from_secs(config.timeout_secs))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl UpstreamSource for PulseClient {
    fn name(&self) -> &'static str {
        "Pulse"
    }

    async fn fetch(&self) -> Result<Value, FetchError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: Value = response.json().await?;
        Ok(body)
    }
}
