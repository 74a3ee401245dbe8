//! Score profile: how one primary score fans out into the named score set.
//!
//! Secondary sources are not scored independently; each is the primary
//! times a fixed multiplier, clamped back into [0, 10].

use crate::config::{DerivedScoreConfig, ScoringConfig};
use crate::types::{NamedScore, MAX_SCORE, MIN_SCORE};

/// Clamp a score into [0, 10]. NaN is left as is so validation rejects it.
pub fn clamp_score(value: f64) -> f64 {
    value.clamp(MIN_SCORE, MAX_SCORE)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreProfile {
    primary: String,
    derived: Vec<DerivedScoreConfig>,
}

impl ScoreProfile {
    pub fn new(cfg: &ScoringConfig) -> Self {
        Self {
            primary: cfg.primary.clone(),
            derived: cfg.derived.clone(),
        }
    }

    pub fn primary_source(&self) -> &str {
        &self.primary
    }

    /// Expand a primary score into the full score list, primary first.
    ///
    /// The primary is passed through untouched (callers validate it);
    /// derived values are clamped.
    pub fn expand(&self, primary: f64) -> Vec<NamedScore> {
        let mut scores = Vec::with_capacity(1 + self.derived.len());
        scores.push(NamedScore::new(self.primary.clone(), primary));
        scores.extend(
            self.derived
                .iter()
                .map(|d| NamedScore::new(d.source.clone(), clamp_score(primary * d.multiplier))),
        );
        scores
    }
}

impl Default for ScoreProfile {
    fn default() -> Self {
        Self::new(&ScoringConfig::default())
    }
}
