//! Token scan orchestrator.
//!
//! One scan walks `Fetching → Dispatching → Collecting → Done`:
//!
//! 1. fetch up to `candidate_limit` tokens from the feed (fatal on failure),
//! 2. spawn one enrichment task for each of the first `enrichment_limit`,
//! 3. wait for every task at a single barrier, drop failures with a log
//!    line each, merge the survivors,
//! 4. return survivors in the feed's order.
//!
//! Only a feed failure escapes a scan. Enrichment errors, timeouts,
//! malformed assessments and panicked tasks all just remove their token.
//! Dropping a scan midway aborts its outstanding enrichment tasks.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::enricher::Enricher;
use crate::config::AppConfig;
use crate::feed::TokenFeed;
use crate::types::{Assessment, Batch, EnrichedItem, RawItem, ScanError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Caps and timeouts for one scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanLimits {
    /// Candidates requested from the feed.
    pub candidate_limit: usize,
    /// Candidates actually enriched (the parallelism bound).
    pub enrichment_limit: usize,
    pub fetch_timeout: Duration,
    pub enrich_timeout: Duration,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            candidate_limit: 20,
            enrichment_limit: 10,
            fetch_timeout: Duration::from_secs(20),
            enrich_timeout: Duration::from_secs(20),
        }
    }
}

impl ScanLimits {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            candidate_limit: cfg.feed.candidate_limit,
            enrichment_limit: cfg.scan.enrichment_limit,
            fetch_timeout: cfg.feed.timeout(),
            enrich_timeout: Duration::from_secs(cfg.scan.enrich_timeout_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Fetching,
    Dispatching,
    Collecting,
    Done,
    Failed,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanPhase::Fetching => "fetching",
            ScanPhase::Dispatching => "dispatching",
            ScanPhase::Collecting => "collecting",
            ScanPhase::Done => "done",
            ScanPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A token removed from the batch, and why.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DroppedItem {
    pub mint: String,
    pub reason: String,
}

/// Summary of one completed scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub scan_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub fetched: usize,
    pub duplicates: usize,
    pub dispatched: usize,
    pub enriched: usize,
    pub dropped: Vec<DroppedItem>,
}

impl ScanReport {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

// ---------------------------------------------------------------------------
// Task set
// ---------------------------------------------------------------------------

/// The enrichment tasks of one scan, in dispatch order. Tasks still running
/// when the set is dropped are aborted.
struct TaskSet<T>(Vec<JoinHandle<T>>);

impl<T> TaskSet<T> {
    /// Wait for every task. Outcomes come back in dispatch order.
    async fn join(&mut self) -> Vec<Result<T, JoinError>> {
        join_all(self.0.iter_mut()).await
    }
}

impl<T> Drop for TaskSet<T> {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Fetch → fan-out enrich → fan-in → filter, written against the
/// `TokenFeed` and `Enricher` traits only.
pub struct Scanner {
    feed: Arc<dyn TokenFeed>,
    enricher: Arc<dyn Enricher>,
    limits: ScanLimits,
}

impl Scanner {
    pub fn new(feed: Arc<dyn TokenFeed>, enricher: Arc<dyn Enricher>, limits: ScanLimits) -> Self {
        Self { feed, enricher, limits }
    }

    pub fn limits(&self) -> &ScanLimits {
        &self.limits
    }

    /// Run one scan and return the ordered batch.
    pub async fn scan(&self) -> Result<Batch, ScanError> {
        self.scan_with_report().await.map(|(batch, _)| batch)
    }

    /// Run one scan, returning the batch and its report.
    pub async fn scan_with_report(&self) -> Result<(Batch, ScanReport), ScanError> {
        let scan_id = Uuid::new_v4();
        let started_at = Utc::now();

        // -- Fetching -----------------------------------------------------

        debug!(%scan_id, phase = %ScanPhase::Fetching, feed = self.feed.name(), "Scan phase");
        let candidates = match self.fetch().await {
            Ok(c) => c,
            Err(e) => {
                warn!(%scan_id, phase = %ScanPhase::Failed, error = %e, "Scan failed");
                return Err(e);
            }
        };
        let fetched = candidates.len();
        let (candidates, duplicates) = Self::dedupe(candidates);
        if duplicates > 0 {
            warn!(%scan_id, duplicates, "Feed returned duplicate mints, keeping first occurrence");
        }

        // -- Dispatching --------------------------------------------------

        let selected: Vec<Arc<RawItem>> = candidates
            .into_iter()
            .take(self.limits.enrichment_limit)
            .map(Arc::new)
            .collect();

        debug!(
            %scan_id,
            phase = %ScanPhase::Dispatching,
            tasks = selected.len(),
            enricher = self.enricher.name(),
            "Scan phase"
        );
        let mut tasks = TaskSet(selected.iter().map(|item| self.dispatch(Arc::clone(item))).collect());

        // -- Collecting ---------------------------------------------------

        debug!(%scan_id, phase = %ScanPhase::Collecting, "Scan phase");
        let outcomes = tasks.join().await;
        let (batch, dropped) = Self::collect(scan_id, &selected, outcomes);

        // -- Done ---------------------------------------------------------

        let report = ScanReport {
            scan_id,
            started_at,
            finished_at: Utc::now(),
            fetched,
            duplicates,
            dispatched: selected.len(),
            enriched: batch.len(),
            dropped,
        };

        info!(
            %scan_id,
            phase = %ScanPhase::Done,
            fetched = report.fetched,
            dispatched = report.dispatched,
            enriched = report.enriched,
            dropped = report.dropped.len(),
            duration_ms = report.duration_ms(),
            "Scan complete"
        );

        Ok((batch, report))
    }

    /// Fetch candidates under the fetch timeout. Every failure here is
    /// reported as `UpstreamUnavailable`.
    async fn fetch(&self) -> Result<Vec<RawItem>, ScanError> {
        let limit = self.limits.candidate_limit;
        let fetched = tokio::time::timeout(self.limits.fetch_timeout, self.feed.fetch_candidates(limit)).await;

        match fetched {
            Ok(Ok(mut candidates)) => {
                candidates.truncate(limit);
                Ok(candidates)
            }
            Ok(Err(ScanError::UpstreamUnavailable(msg))) => Err(ScanError::UpstreamUnavailable(msg)),
            Ok(Err(other)) => Err(ScanError::UpstreamUnavailable(other.to_string())),
            Err(_) => Err(ScanError::UpstreamUnavailable(format!(
                "{} did not answer within {:?}",
                self.feed.name(),
                self.limits.fetch_timeout
            ))),
        }
    }

    /// Spawn one enrichment task, bounded by the per-task timeout.
    fn dispatch(&self, item: Arc<RawItem>) -> JoinHandle<Result<Assessment, ScanError>> {
        let enricher = Arc::clone(&self.enricher);
        let limit = self.limits.enrich_timeout;

        tokio::spawn(async move {
            match tokio::time::timeout(limit, enricher.assess(&item)).await {
                Ok(result) => result,
                Err(_) => Err(ScanError::enrichment(&item.mint, format!("timed out after {limit:?}"))),
            }
        })
    }

    /// Keep the first occurrence of each mint, preserving order.
    fn dedupe(candidates: Vec<RawItem>) -> (Vec<RawItem>, usize) {
        let before = candidates.len();
        let mut seen = HashSet::with_capacity(before);
        let unique: Vec<RawItem> = candidates
            .into_iter()
            .filter(|c| seen.insert(c.mint.clone()))
            .collect();
        let removed = before - unique.len();
        (unique, removed)
    }

    /// Pair each dispatched item with its task outcome, in dispatch order.
    /// Survivors are validated and merged; everything else is dropped.
    fn collect(
        scan_id: Uuid,
        items: &[Arc<RawItem>],
        outcomes: Vec<Result<Result<Assessment, ScanError>, JoinError>>,
    ) -> (Batch, Vec<DroppedItem>) {
        let mut batch = Vec::with_capacity(items.len());
        let mut dropped = Vec::new();

        for (item, outcome) in items.iter().zip(outcomes) {
            let result = outcome
                .unwrap_or_else(|e| Err(ScanError::enrichment(&item.mint, format!("task aborted: {e}"))))
                .and_then(|assessment| {
                    assessment.validate(&item.mint)?;
                    Ok(assessment)
                });

            match result {
                Ok(assessment) => {
                    debug!(
                        %scan_id,
                        token = %item,
                        rating = %assessment.rating,
                        score = ?assessment.primary_score(),
                        "Token enriched"
                    );
                    batch.push(EnrichedItem::merge(item, &assessment));
                }
                Err(e) => {
                    warn!(%scan_id, token = %item, error = %e, "Dropping token from batch");
                    dropped.push(DroppedItem {
                        mint: item.mint.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        (batch, dropped)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
