//! pump.fun token listing client.
//!
//! Base URL: https://frontend-api.pump.fun
//! Endpoint: `GET /coins?limit=N&sort=last_trade_timestamp&order=DESC`
//! Auth: none. Returns a JSON array of coin records. Only `mint` is
//! required; every other field is passed through untouched.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use super::TokenFeed;
use crate::config::FeedConfig;
use crate::types::{RawItem, ScanError};

const FEED_NAME: &str = "pump.fun";

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// pump.fun listing client.
pub struct PumpFunClient {
    http: Client,
    base_url: String,
    sort: String,
    order: String,
}

impl PumpFunClient {
    /// Create a new client from the feed section of the app config.
    pub fn new(cfg: &FeedConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(cfg.timeout())
            .user_agent("AWARE/0.1.0 (token-scanner)")
            .build()
            .context("Failed to build HTTP client for pump.fun")?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            sort: cfg.sort.clone(),
            order: cfg.order.clone(),
        })
    }

    /// Listing URL for a given page size.
    pub fn coins_url(&self, limit: usize) -> String {
        format!(
            "{}/coins?limit={}&sort={}&order={}",
            self.base_url,
            limit,
            urlencoding::encode(&self.sort),
            urlencoding::encode(&self.order),
        )
    }

    async fn fetch_coins(&self, limit: usize) -> Result<Vec<RawItem>> {
        let url = self.coins_url(limit);
        debug!(url = %url, "Fetching pump.fun coins");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("pump.fun request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("pump.fun API error {status}: {body}");
        }

        let body = resp.text().await.context("Failed to read pump.fun response")?;
        Self::parse_coins(&body, limit)
    }

    /// Decode a listing body, keeping feed order and at most `limit` entries.
    pub fn parse_coins(body: &str, limit: usize) -> Result<Vec<RawItem>> {
        let mut coins: Vec<RawItem> =
            serde_json::from_str(body).context("Failed to parse pump.fun coins response")?;
        coins.truncate(limit);
        Ok(coins)
    }
}

// ---------------------------------------------------------------------------
// TokenFeed trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl TokenFeed for PumpFunClient {
    async fn fetch_candidates(&self, limit: usize) -> Result<Vec<RawItem>, ScanError> {
        let coins = self
            .fetch_coins(limit)
            .await
            .map_err(|e| ScanError::UpstreamUnavailable(format!("{e:#}")))?;

        info!(count = coins.len(), limit, "pump.fun candidates fetched");
        Ok(coins)
    }

    fn name(&self) -> &str {
        FEED_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
