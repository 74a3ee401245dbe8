//! Anthropic Claude LLM integration.
//!
//! Implements `LlmClient` on top of the Anthropic Messages API with retry
//! and exponential backoff on rate limits and server errors.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::LlmClient;
use crate::config::LlmConfig;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Maximum retries on rate limit / server errors.
const MAX_RETRIES: u32 = 2;

/// Base delay for exponential backoff (ms).
const BASE_BACKOFF_MS: u64 = 500;

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct AnthropicClient {
    http: Client,
    api_url: String,
    api_key: SecretString,
    model: String,
    total_calls: AtomicU64,
}

impl AnthropicClient {
    pub fn new(cfg: &LlmConfig, api_key: SecretString) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("Failed to build Anthropic HTTP client")?;

        Ok(Self {
            http,
            api_url: cfg.api_url.clone(),
            api_key,
            model: cfg.model.clone(),
            total_calls: AtomicU64::new(0),
        })
    }

    /// Number of successful API calls so far.
    pub fn total_calls(&self) -> u64 {
        self.total_calls.load(Ordering::Relaxed)
    }

    /// Join all text blocks of a Messages response.
    fn extract_text(body: MessagesResponse) -> Result<String> {
        let text = body
            .content
            .into_iter()
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() {
            anyhow::bail!("Anthropic response contained no text");
        }
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// LlmClient implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens,
            messages: vec![Message { role: "user", content: prompt }],
        };

        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
                debug!(attempt, delay_ms = delay, "Retrying Anthropic API call");
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let resp = self
                .http
                .post(&self.api_url)
                .header("x-api-key", self.api_key.expose_secret())
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let body: MessagesResponse = response
                            .json()
                            .await
                            .context("Failed to parse Anthropic response")?;
                        self.total_calls.fetch_add(1, Ordering::Relaxed);
                        return Self::extract_text(body);
                    }

                    // 429, 5xx and 529 (overloaded) are worth another try.
                    if status.as_u16() == 429 || status.is_server_error() {
                        let error_text = response.text().await.unwrap_or_default();
                        warn!(status = %status, attempt, error = %error_text, "Retryable Anthropic API error");
                        last_error = Some(format!("HTTP {status}: {error_text}"));
                        continue;
                    }

                    let error_text = response.text().await.unwrap_or_default();
                    anyhow::bail!("Anthropic API error {status}: {error_text}");
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Anthropic request failed");
                    last_error = Some(format!("Request error: {e}"));
                }
            }
        }

        anyhow::bail!(
            "Anthropic API failed after {} retries: {}",
            MAX_RETRIES,
            last_error.unwrap_or_default()
        )
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
