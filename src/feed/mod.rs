//! Token listing feeds.
//!
//! Defines the `TokenFeed` trait and the pump.fun implementation used in
//! production.

pub mod pumpfun;

use async_trait::async_trait;

use crate::types::{RawItem, ScanError};

/// Abstraction over token listing services.
///
/// Implementors return at most `limit` candidates, most recently traded
/// first, in the order the upstream service returned them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenFeed: Send + Sync {
    /// Fetch up to `limit` candidates.
    ///
    /// Any transport or decoding failure is `ScanError::UpstreamUnavailable`;
    /// an empty list means the feed genuinely had nothing.
    async fn fetch_candidates(&self, limit: usize) -> Result<Vec<RawItem>, ScanError>;

    /// Feed name for logging.
    fn name(&self) -> &str;
}
