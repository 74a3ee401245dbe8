//! Shared types for the AWARE scanner.
//!
//! These types form the data model used across the feed client, the
//! enrichers, the scan orchestrator and the HTTP layer.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Lower bound of every assessment score.
pub const MIN_SCORE: f64 = 0.0;
/// Upper bound of every assessment score.
pub const MAX_SCORE: f64 = 10.0;

// ---------------------------------------------------------------------------
// Raw item
// ---------------------------------------------------------------------------

/// A token record as returned by the listing feed, not yet assessed.
///
/// Only `mint` is required. Every other field the feed sends is kept
/// verbatim in `fields` (nulls and odd types included) and passed through to
/// the caller; the accessors below read the few the scanner reasons about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    /// Token mint address, unique within a batch.
    pub mint: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RawItem {
    /// Minimal item with only the identifying fields set.
    pub fn new(mint: impl Into<String>, name: impl Into<String>, symbol: impl Into<String>) -> Self {
        let mut item = Self {
            mint: mint.into(),
            fields: Map::new(),
        };
        item.set("name", name.into());
        item.set("symbol", symbol.into());
        item
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn name(&self) -> &str {
        self.text("name")
    }

    pub fn symbol(&self) -> &str {
        self.text("symbol")
    }

    /// Market cap in SOL as reported by the feed.
    pub fn market_cap(&self) -> Option<f64> {
        self.number("market_cap")
    }

    /// Market cap in USD when the feed supplies `usd_market_cap`.
    pub fn usd_market_cap(&self) -> Option<f64> {
        self.number("usd_market_cap")
    }

    pub fn holder_count(&self) -> Option<u64> {
        self.number("holder_count")
            .filter(|v| *v >= 0.0 && v.fract() == 0.0)
            .map(|v| v as u64)
    }

    /// Milliseconds since epoch.
    pub fn last_trade_timestamp(&self) -> Option<i64> {
        self.number("last_trade_timestamp")
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i64)
    }

    /// Last trade time, if the feed reported a valid one.
    pub fn last_trade_at(&self) -> Option<DateTime<Utc>> {
        self.last_trade_timestamp()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    fn text(&self, key: &str) -> &str {
        self.fields.get(key).and_then(Value::as_str).unwrap_or("")
    }

    /// Numbers and numeric strings are accepted; anything else reads as absent.
    fn number(&self, key: &str) -> Option<f64> {
        let value = match self.fields.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        value.filter(|v| v.is_finite())
    }
}

impl fmt::Display for RawItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) [{}]", self.name(), self.symbol(), self.mint)
    }
}

// ---------------------------------------------------------------------------
// Assessment
// ---------------------------------------------------------------------------

/// Traffic-light quality rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Green,
    Yellow,
    Red,
}

impl Rating {
    pub const ALL: [Rating; 3] = [Rating::Green, Rating::Yellow, Rating::Red];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Green => "green",
            Rating::Yellow => "yellow",
            Rating::Red => "red",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; anything outside the three colours is rejected.
impl std::str::FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "green" => Ok(Rating::Green),
            "yellow" => Ok(Rating::Yellow),
            "red" => Ok(Rating::Red),
            other => Err(format!("unknown rating '{other}'")),
        }
    }
}

/// One score from one named source, e.g. `claudeScore = 7.4`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedScore {
    pub source: String,
    pub value: f64,
}

impl NamedScore {
    pub fn new(source: impl Into<String>, value: f64) -> Self {
        Self { source: source.into(), value }
    }

    pub fn in_range(&self) -> bool {
        self.value.is_finite() && (MIN_SCORE..=MAX_SCORE).contains(&self.value)
    }
}

/// Enrichment output for one raw item. The first score is the primary.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub rating: Rating,
    pub scores: Vec<NamedScore>,
    pub reasoning: Option<String>,
}

impl Assessment {
    pub fn primary_score(&self) -> Option<f64> {
        self.scores.first().map(|s| s.value)
    }

    /// Check the assessment is fit to be shown for `item_id`.
    ///
    /// The rating is enforced by the type; what is left is at least one
    /// score and every score finite and within [0, 10].
    pub fn validate(&self, item_id: &str) -> Result<(), ScanError> {
        if self.scores.is_empty() {
            return Err(ScanError::MalformedAssessment {
                item_id: item_id.to_string(),
                reason: "no scores".into(),
            });
        }
        if let Some(bad) = self.scores.iter().find(|s| !s.in_range()) {
            return Err(ScanError::MalformedAssessment {
                item_id: item_id.to_string(),
                reason: format!("{} = {} outside [{MIN_SCORE}, {MAX_SCORE}]", bad.source, bad.value),
            });
        }
        Ok(())
    }

    /// Flat JSON fields contributed to an enriched item.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("aiRating".into(), Value::from(self.rating.as_str()));
        for score in &self.scores {
            fields.insert(score.source.clone(), Value::from(score.value));
        }
        if let Some(reasoning) = &self.reasoning {
            fields.insert("reasoning".into(), Value::from(reasoning.as_str()));
        }
        fields
    }
}

impl Serialize for Assessment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_fields().serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Enriched item
// ---------------------------------------------------------------------------

/// A raw item merged with its assessment. Serializes as one flat object
/// holding the feed's fields plus `aiRating`, the scores and `reasoning`.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedItem {
    pub item: RawItem,
    pub assessment: Assessment,
}

impl EnrichedItem {
    /// Pure merge. On key collision the assessment's field wins.
    pub fn merge(item: &RawItem, assessment: &Assessment) -> Self {
        Self {
            item: item.clone(),
            assessment: assessment.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.item.mint
    }

    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = self.item.fields.clone();
        fields.insert("mint".into(), Value::from(self.item.mint.as_str()));
        fields.extend(self.assessment.to_fields());
        fields
    }
}

impl Serialize for EnrichedItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_fields().serialize(serializer)
    }
}

/// Ordered output of one scan.
pub type Batch = Vec<EnrichedItem>;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by the scan pipeline.
///
/// Only `UpstreamUnavailable` ever reaches a caller of a scan; the other
/// two are contained per item by the orchestrator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScanError {
    #[error("Token feed unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Enrichment failed for {item_id}: {reason}")]
    EnrichmentFailed { item_id: String, reason: String },

    #[error("Malformed assessment for {item_id}: {reason}")]
    MalformedAssessment { item_id: String, reason: String },
}

impl ScanError {
    pub fn enrichment(item_id: &str, reason: impl fmt::Display) -> Self {
        ScanError::EnrichmentFailed {
            item_id: item_id.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(item_id: &str, reason: impl fmt::Display) -> Self {
        ScanError::MalformedAssessment {
            item_id: item_id.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error is fatal to a whole scan.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScanError::UpstreamUnavailable(_))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_assessment() -> Assessment {
        Assessment {
            rating: Rating::Yellow,
            scores: vec![
                NamedScore::new("claudeScore", 7.5),
                NamedScore::new("gptScore", 7.125),
            ],
            reasoning: Some("thin liquidity".into()),
        }
    }

    #[test]
    fn test_raw_item_keeps_unknown_fields() {
        let raw: RawItem = serde_json::from_value(json!({
            "mint": "Mint111",
            "name": "Dog Hat",
            "symbol": "WIF",
            "market_cap": 42.5,
            "holder_count": 120,
            "last_trade_timestamp": 1_700_000_000_000i64,
            "usd_market_cap": 6100.0,
            "twitter": "https://x.com/doghat"
        }))
        .unwrap();

        assert_eq!(raw.mint, "Mint111");
        assert_eq!(raw.name(), "Dog Hat");
        assert_eq!(raw.market_cap(), Some(42.5));
        assert_eq!(raw.holder_count(), Some(120));
        assert_eq!(raw.usd_market_cap(), Some(6100.0));
        assert_eq!(raw.fields["twitter"], "https://x.com/doghat");
        assert!(raw.last_trade_at().is_some());
        assert_eq!(raw.to_string(), "Dog Hat (WIF) [Mint111]");
    }

    #[test]
    fn test_raw_item_missing_optional_fields() {
        let raw: RawItem = serde_json::from_value(json!({ "mint": "M" })).unwrap();
        assert!(raw.name().is_empty());
        assert!(raw.market_cap().is_none());
        assert!(raw.last_trade_at().is_none());
    }

    #[test]
    fn test_raw_item_stats_read_leniently() {
        let raw: RawItem = serde_json::from_value(json!({
            "mint": "M",
            "name": null,
            "market_cap": "31.5",
            "holder_count": 12.0,
            "last_trade_timestamp": "1700000000000",
            "usd_market_cap": { "value": 1 }
        }))
        .unwrap();

        assert_eq!(raw.name(), "");
        assert_eq!(raw.market_cap(), Some(31.5));
        assert_eq!(raw.holder_count(), Some(12));
        assert_eq!(raw.last_trade_timestamp(), Some(1_700_000_000_000));
        assert!(raw.usd_market_cap().is_none());
        assert_eq!(raw.fields["usd_market_cap"], json!({ "value": 1 }));
    }

    #[test]
    fn test_raw_item_rejects_fractional_or_negative_counts() {
        let mut raw = RawItem::new("M", "X", "X");
        raw.set("holder_count", 12.5);
        assert!(raw.holder_count().is_none());
        raw.set("holder_count", -3);
        assert!(raw.holder_count().is_none());
    }

    #[test]
    fn test_raw_item_requires_mint() {
        let raw = serde_json::from_value::<RawItem>(json!({ "name": "No id" }));
        assert!(raw.is_err());
    }

    #[test]
    fn test_rating_parse() {
        assert_eq!("Green".parse::<Rating>().unwrap(), Rating::Green);
        assert_eq!(" red ".parse::<Rating>().unwrap(), Rating::Red);
        assert!("purple".parse::<Rating>().is_err());
    }

    #[test]
    fn test_rating_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Rating::Yellow).unwrap(), "\"yellow\"");
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut a = sample_assessment();
        a.scores.push(NamedScore::new("grokScore", 10.3));
        let err = a.validate("M").unwrap_err();
        assert!(matches!(err, ScanError::MalformedAssessment { .. }));
    }

    #[test]
    fn test_validate_rejects_nan_and_empty() {
        let mut a = sample_assessment();
        a.scores[0].value = f64::NAN;
        assert!(a.validate("M").is_err());

        a.scores.clear();
        assert!(a.validate("M").is_err());
    }

    #[test]
    fn test_validate_accepts_bounds() {
        let a = Assessment {
            rating: Rating::Red,
            scores: vec![NamedScore::new("claudeScore", 0.0), NamedScore::new("grokScore", 10.0)],
            reasoning: None,
        };
        assert!(a.validate("M").is_ok());
    }

    #[test]
    fn test_merge_flattens_both_sides() {
        let mut raw = RawItem::new("Mint1", "Alpha", "ALP");
        raw.set("image_uri", "ipfs://x");

        let merged = EnrichedItem::merge(&raw, &sample_assessment());
        let value = serde_json::to_value(&merged).unwrap();

        assert_eq!(value["mint"], "Mint1");
        assert_eq!(value["image_uri"], "ipfs://x");
        assert_eq!(value["aiRating"], "yellow");
        assert_eq!(value["claudeScore"], 7.5);
        assert_eq!(value["reasoning"], "thin liquidity");
    }

    #[test]
    fn test_merge_assessment_wins_collisions() {
        let mut raw = RawItem::new("Mint1", "Alpha", "ALP");
        raw.set("aiRating", "bogus");

        let merged = EnrichedItem::merge(&raw, &sample_assessment());
        let value = serde_json::to_value(&merged).unwrap();
        assert_eq!(value["aiRating"], "yellow");
    }

    #[test]
    fn test_merge_is_deterministic() {
        let mut raw = RawItem::new("Mint1", "Alpha", "ALP");
        raw.set("z_field", 1);
        raw.set("a_field", json!([1, 2]));
        let a = sample_assessment();

        let first = serde_json::to_vec(&EnrichedItem::merge(&raw, &a)).unwrap();
        let second = serde_json::to_vec(&EnrichedItem::merge(&raw, &a)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_merge_keeps_null_feed_fields() {
        let raw: RawItem = serde_json::from_value(json!({
            "mint": "M",
            "name": "Alpha",
            "symbol": "ALP",
            "market_cap": null,
            "holder_count": null,
            "last_trade_timestamp": null,
            "twitter": null
        }))
        .unwrap();

        let value = serde_json::to_value(EnrichedItem::merge(&raw, &sample_assessment())).unwrap();
        let obj = value.as_object().unwrap();
        for key in ["market_cap", "holder_count", "last_trade_timestamp", "twitter"] {
            assert_eq!(obj.get(key), Some(&Value::Null), "{key} lost");
        }
        let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "aiRating", "claudeScore", "gptScore", "holder_count", "last_trade_timestamp",
                "market_cap", "mint", "name", "reasoning", "symbol", "twitter",
            ]
        );
    }

    #[test]
    fn test_reasoning_omitted_when_absent() {
        let mut a = sample_assessment();
        a.reasoning = None;
        assert!(!a.to_fields().contains_key("reasoning"));
    }

    #[test]
    fn test_scan_error_fatality() {
        assert!(ScanError::UpstreamUnavailable("down".into()).is_fatal());
        assert!(!ScanError::enrichment("M", "timeout").is_fatal());
        assert!(!ScanError::malformed("M", "rating").is_fatal());
    }
}
