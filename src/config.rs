//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section has defaults, so a partial (or missing) file is fine. Secrets
//! are referenced by env-var name in the config and resolved exactly once
//! at startup into [`Secrets`], which is then handed to the components that
//! need it.

use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub feed: FeedConfig,
    pub scan: ScanConfig,
    pub enricher: EnricherConfig,
    pub scoring: ScoringConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory served for any non-API path.
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            static_dir: "public".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    /// How many candidates to request from the feed.
    pub candidate_limit: usize,
    pub sort: String,
    pub order: String,
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://frontend-api.pump.fun".into(),
            candidate_limit: 20,
            sort: "last_trade_timestamp".into(),
            order: "DESC".into(),
            timeout_secs: 20,
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScanConfig {
    /// How many of the fetched candidates are enriched.
    pub enrichment_limit: usize,
    pub enrich_timeout_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            enrichment_limit: 10,
            enrich_timeout_secs: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnricherStrategy {
    #[default]
    Synthetic,
    Llm,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EnricherConfig {
    pub strategy: EnricherStrategy,
    /// Fixed RNG seed for the synthetic strategy (reproducible scans).
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DerivedScoreConfig {
    pub source: String,
    pub multiplier: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    /// Output key of the primary score.
    pub primary: String,
    pub derived: Vec<DerivedScoreConfig>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            primary: "claudeScore".into(),
            derived: vec![
                DerivedScoreConfig { source: "gptScore".into(), multiplier: 0.95 },
                DerivedScoreConfig { source: "grokScore".into(), multiplier: 1.05 },
            ],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub api_url: String,
    pub model: String,
    pub api_key_env: String,
    pub chat_max_tokens: u32,
    pub analyze_max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com/v1/messages".into(),
            model: "claude-sonnet-4-20250514".into(),
            api_key_env: "CLAUDE_API_KEY".into(),
            chat_max_tokens: 1000,
            analyze_max_tokens: 500,
            timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the scanner cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.feed.candidate_limit == 0 {
            bail!("feed.candidate_limit must be positive");
        }
        if self.scan.enrichment_limit == 0 {
            bail!("scan.enrichment_limit must be positive");
        }
        if self.scan.enrichment_limit > self.feed.candidate_limit {
            bail!(
                "scan.enrichment_limit ({}) exceeds feed.candidate_limit ({})",
                self.scan.enrichment_limit,
                self.feed.candidate_limit
            );
        }
        if self.feed.timeout_secs == 0 || self.scan.enrich_timeout_secs == 0 {
            bail!("timeouts must be at least one second");
        }
        for d in &self.scoring.derived {
            if !d.multiplier.is_finite() || d.multiplier < 0.0 {
                bail!("scoring multiplier for {} must be finite and non-negative", d.source);
            }
        }
        Ok(())
    }

    /// Apply environment overrides (currently only `PORT`).
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }
}

/// Secrets resolved once at startup. Never logged.
#[derive(Clone, Default)]
pub struct Secrets {
    pub llm_api_key: Option<SecretString>,
}

impl Secrets {
    /// Resolve every env-var reference in `cfg`. Empty values count as unset.
    pub fn from_env(cfg: &AppConfig) -> Self {
        let llm_api_key = std::env::var(&cfg.llm.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::new);
        Self { llm_api_key }
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("llm_api_key", &self.llm_api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
