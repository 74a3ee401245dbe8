//! Component wiring.
//!
//! Turns the loaded configuration and resolved secrets into the shared
//! server state: feed client, enrichment strategy, scanner and LLM client.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AppConfig, EnricherStrategy, Secrets};
use crate::engine::enricher::{Enricher, LlmEnricher, SyntheticEnricher};
use crate::engine::scanner::{ScanLimits, Scanner};
use crate::engine::scoring::ScoreProfile;
use crate::feed::pumpfun::PumpFunClient;
use crate::llm::anthropic::AnthropicClient;
use crate::llm::LlmClient;
use crate::server::{AppState, ServerState};

/// Build every component from `cfg`. Nothing reads the environment after this.
pub fn build_state(cfg: &AppConfig, secrets: &Secrets) -> Result<AppState> {
    let profile = ScoreProfile::new(&cfg.scoring);

    let llm: Option<Arc<dyn LlmClient>> = match &secrets.llm_api_key {
        Some(key) => {
            let client = AnthropicClient::new(&cfg.llm, key.clone())
                .context("Failed to initialise Anthropic client")?;
            info!(model = %cfg.llm.model, "Using Anthropic LLM provider");
            Some(Arc::new(client))
        }
        None => {
            warn!(env = %cfg.llm.api_key_env, "No LLM API key configured; chat and analyze are disabled");
            None
        }
    };

    let analyst: Option<Arc<dyn Enricher>> = llm.clone().map(|l| {
        Arc::new(LlmEnricher::new(l, profile.clone(), cfg.llm.analyze_max_tokens)) as Arc<dyn Enricher>
    });

    let scan_enricher = select_enricher(cfg, &profile, analyst.clone());
    info!(strategy = scan_enricher.name(), "Scan enrichment strategy selected");

    let feed = PumpFunClient::new(&cfg.feed).context("Failed to initialise pump.fun client")?;
    let scanner = Scanner::new(Arc::new(feed), scan_enricher, ScanLimits::from_config(cfg));

    Ok(Arc::new(ServerState::new(scanner, llm, analyst, cfg.llm.chat_max_tokens)))
}

/// Pick the scan enricher. `llm` without a live client degrades to synthetic.
fn select_enricher(
    cfg: &AppConfig,
    profile: &ScoreProfile,
    analyst: Option<Arc<dyn Enricher>>,
) -> Arc<dyn Enricher> {
    let synthetic = || -> Arc<dyn Enricher> {
        match cfg.enricher.seed {
            Some(seed) => Arc::new(SyntheticEnricher::seeded(profile.clone(), seed)),
            None => Arc::new(SyntheticEnricher::new(profile.clone())),
        }
    };

    match (cfg.enricher.strategy, analyst) {
        (EnricherStrategy::Llm, Some(analyst)) => analyst,
        (EnricherStrategy::Llm, None) => {
            warn!("enricher.strategy = \"llm\" but no API key; falling back to synthetic");
            synthetic()
        }
        (EnricherStrategy::Synthetic, _) => synthetic(),
    }
}
