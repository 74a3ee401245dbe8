//! Token enrichment strategies.
//!
//! An `Enricher` turns one raw feed item into an `Assessment`. Two
//! strategies exist and are picked once at startup:
//!
//! - `SyntheticEnricher`: pseudo-random ratings and scores, for running
//!   without an LLM backend (seedable, so scans can be reproduced).
//! - `LlmEnricher`: one LLM call per token, parsed into a rating and a
//!   primary score.
//!
//! Either way the secondary scores come from the `ScoreProfile`.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::scoring::ScoreProfile;
use crate::llm::LlmClient;
use crate::types::{Assessment, Rating, RawItem, ScanError, MAX_SCORE, MIN_SCORE};

/// Synthetic primary scores fall in [6, 10).
const SYNTHETIC_SCORE_FLOOR: f64 = 6.0;
const SYNTHETIC_SCORE_SPAN: f64 = 4.0;

/// Abstraction over assessment producers.
///
/// A failure concerns exactly the one item passed in; the scanner catches
/// it and drops that item.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn assess(&self, item: &RawItem) -> Result<Assessment, ScanError>;

    /// Strategy name for logging.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Synthetic
// ---------------------------------------------------------------------------

pub struct SyntheticEnricher {
    rng: Mutex<StdRng>,
    profile: ScoreProfile,
}

impl SyntheticEnricher {
    pub fn new(profile: ScoreProfile) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            profile,
        }
    }

    /// Same seed, same sequence of assessments.
    pub fn seeded(profile: ScoreProfile, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            profile,
        }
    }
}

#[async_trait]
impl Enricher for SyntheticEnricher {
    async fn assess(&self, item: &RawItem) -> Result<Assessment, ScanError> {
        let (rating, primary) = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let rating = Rating::ALL[rng.gen_range(0..Rating::ALL.len())];
            let primary = SYNTHETIC_SCORE_FLOOR + rng.gen::<f64>() * SYNTHETIC_SCORE_SPAN;
            (rating, primary)
        };

        debug!(mint = %item.mint, rating = %rating, primary, "Synthetic assessment");

        Ok(Assessment {
            rating,
            scores: self.profile.expand(primary),
            reasoning: None,
        })
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

// ---------------------------------------------------------------------------
// LLM-backed
// ---------------------------------------------------------------------------

/// The JSON object the analysis prompt asks for.
#[derive(Debug, Deserialize)]
struct Verdict {
    rating: String,
    score: f64,
    #[serde(default)]
    reasoning: Option<String>,
}

pub struct LlmEnricher {
    llm: Arc<dyn LlmClient>,
    profile: ScoreProfile,
    max_tokens: u32,
}

impl LlmEnricher {
    pub fn new(llm: Arc<dyn LlmClient>, profile: ScoreProfile, max_tokens: u32) -> Self {
        Self { llm, profile, max_tokens }
    }

    /// Build the analysis prompt for one token.
    pub fn build_prompt(item: &RawItem) -> String {
        let market_cap = item
            .usd_market_cap()
            .or(item.market_cap())
            .map(|v| format!("{v:.2}"))
            .unwrap_or_else(|| "unknown".into());
        let holders = item
            .holder_count()
            .map(|h| h.to_string())
            .unwrap_or_else(|| "unknown".into());
        let last_trade = item
            .last_trade_at()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "unknown".into());

        format!(
            "Analyze this crypto token and give a rating (green/yellow/red) and score (0-10):\n\
             Name: {}\n\
             Symbol: {}\n\
             Market Cap: ${market_cap}\n\
             Holders: {holders}\n\
             Last Trade: {last_trade}\n\n\
             Respond with JSON only: {{\"rating\": \"green\", \"score\": 8.5, \"reasoning\": \"...\"}}",
            item.name(),
            item.symbol(),
        )
    }

    /// Parse the model reply into an assessment for `item_id`.
    ///
    /// Models like to wrap JSON in prose or code fences, so the outermost
    /// `{...}` span is decoded. Undecodable replies are enrichment failures;
    /// decodable but out-of-contract ones are malformed assessments.
    pub fn parse_reply(&self, item_id: &str, text: &str) -> Result<Assessment, ScanError> {
        let json = match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if start < end => &text[start..=end],
            _ => return Err(ScanError::enrichment(item_id, "no JSON object in LLM reply")),
        };

        let verdict: Verdict = serde_json::from_str(json)
            .map_err(|e| ScanError::enrichment(item_id, format!("invalid LLM JSON: {e}")))?;

        let rating: Rating = verdict
            .rating
            .parse()
            .map_err(|e| ScanError::malformed(item_id, e))?;

        if !verdict.score.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(&verdict.score) {
            return Err(ScanError::malformed(
                item_id,
                format!("score {} outside [{MIN_SCORE}, {MAX_SCORE}]", verdict.score),
            ));
        }

        Ok(Assessment {
            rating,
            scores: self.profile.expand(verdict.score),
            reasoning: verdict.reasoning.filter(|r| !r.trim().is_empty()),
        })
    }
}

#[async_trait]
impl Enricher for LlmEnricher {
    async fn assess(&self, item: &RawItem) -> Result<Assessment, ScanError> {
        let prompt = Self::build_prompt(item);

        debug!(mint = %item.mint, model = %self.llm.model_name(), "Requesting token analysis");

        let reply = self
            .llm
            .complete(&prompt, self.max_tokens)
            .await
            .map_err(|e| ScanError::enrichment(&item.mint, format!("{e:#}")))?;

        self.parse_reply(&item.mint, &reply)
    }

    fn name(&self) -> &str {
        "llm"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
