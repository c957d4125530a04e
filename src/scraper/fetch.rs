//! HTTP fetching for meet pages.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use super::rate_limiter::RateLimiter;
use crate::retry::{retry, RetryConfig};

const USER_AGENT: &str = concat!("xc-stats/", env!("CARGO_PKG_VERSION"));

/// Rate-limited, retrying page fetcher
pub struct Fetcher {
    client: reqwest::Client,
    limiter: RateLimiter,
    retry_config: RetryConfig,
}

impl Fetcher {
    pub fn new(requests_per_minute: u32, max_retries: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            limiter: RateLimiter::new(requests_per_minute, 0.5, 1.5),
            retry_config: RetryConfig::with_max_retries(max_retries),
        })
    }

    /// Fetch one page body, waiting for the rate limiter first.
    pub async fn fetch_page(&self, url: &str) -> Result<String> {
        self.limiter.acquire().await;
        info!(%url, "fetching results page");

        retry(&self.retry_config, url, || async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .with_context(|| format!("request to {} failed", url))?;
            let response = response
                .error_for_status()
                .with_context(|| format!("{} returned an error status", url))?;
            response
                .text()
                .await
                .with_context(|| format!("failed to read body from {}", url))
        })
        .await
    }
}
