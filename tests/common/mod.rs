//! In-memory feed and enricher for integration testing.
//!
//! Deterministic `TokenFeed` and `Enricher` implementations with no
//! external dependencies. Behaviour is fully controllable from test code.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aware::engine::enricher::Enricher;
use aware::engine::scoring::ScoreProfile;
use aware::feed::TokenFeed;
use aware::types::{Assessment, NamedScore, Rating, RawItem, ScanError};

/// A feed serving a fixed token list.
pub struct MockFeed {
    tokens: Vec<RawItem>,
    /// If set, every fetch fails with this message.
    force_error: Mutex<Option<String>>,
    requested_limits: Mutex<Vec<usize>>,
}

impl MockFeed {
    pub fn new(tokens: Vec<RawItem>) -> Self {
        Self {
            tokens,
            force_error: Mutex::new(None),
            requested_limits: Mutex::new(Vec::new()),
        }
    }

    /// Force all subsequent fetches to fail.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    /// Limits passed to `fetch_candidates`, in call order.
    pub fn requested_limits(&self) -> Vec<usize> {
        self.requested_limits.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenFeed for MockFeed {
    async fn fetch_candidates(&self, limit: usize) -> Result<Vec<RawItem>, ScanError> {
        self.requested_limits.lock().unwrap().push(limit);
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(ScanError::UpstreamUnavailable(msg));
        }
        Ok(self.tokens.iter().take(limit).cloned().collect())
    }

    fn name(&self) -> &str {
        "mock-feed"
    }
}

/// What the scripted enricher does for one mint.
#[derive(Clone)]
pub enum Script {
    Succeed(Rating, f64),
    Fail,
    /// Returns a primary score outside [0, 10].
    OutOfRange,
    /// Sleeps before succeeding.
    Delay(Duration),
}

/// Enricher whose per-mint behaviour is scripted. Unscripted mints succeed
/// with a green 7.0 after a short delay (so tasks actually overlap).
pub struct ScriptedEnricher {
    scripts: HashMap<String, Script>,
    profile: ScoreProfile,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedEnricher {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            profile: ScoreProfile::default(),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, mint: &str, script: Script) -> Self {
        self.scripts.insert(mint.to_string(), script);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of `assess` calls observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn run(&self, item: &RawItem) -> Result<Assessment, ScanError> {
        let script = self
            .scripts
            .get(&item.mint)
            .cloned()
            .unwrap_or(Script::Delay(Duration::from_millis(50)));

        match script {
            Script::Succeed(rating, primary) => Ok(Assessment {
                rating,
                scores: self.profile.expand(primary),
                reasoning: Some(format!("scripted for {}", item.mint)),
            }),
            Script::Fail => Err(ScanError::enrichment(&item.mint, "scripted failure")),
            Script::OutOfRange => Ok(Assessment {
                rating: Rating::Green,
                scores: vec![NamedScore::new("claudeScore", 11.5)],
                reasoning: None,
            }),
            Script::Delay(d) => {
                tokio::time::sleep(d).await;
                Ok(Assessment {
                    rating: Rating::Green,
                    scores: self.profile.expand(7.0),
                    reasoning: None,
                })
            }
        }
    }
}

#[async_trait]
impl Enricher for ScriptedEnricher {
    async fn assess(&self, item: &RawItem) -> Result<Assessment, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = self.run(item).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// `n` tokens with mints `tok-1` … `tok-n`, in feed order.
pub fn tokens(n: usize) -> Vec<RawItem> {
    (1..=n)
        .map(|i| {
            let mut t = RawItem::new(format!("tok-{i}"), format!("Token {i}"), format!("TK{i}"));
            t.set("market_cap", 25.0 + i as f64);
            t.set("holder_count", 10 * i as u64);
            t.set("last_trade_timestamp", 1_700_000_000_000 - i as i64 * 1000);
            t.set("image_uri", format!("ipfs://{i}"));
            t
        })
        .collect()
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
