//! API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<ServerState>`.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use super::error::ApiError;
use crate::engine::enricher::Enricher;
use crate::engine::scanner::{ScanReport, Scanner};
use crate::llm::{chat_prompt, LlmClient};
use crate::types::{Assessment, Batch, RawItem};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ServerState {
    pub scanner: Scanner,
    /// Chat backend; `None` when no API key is configured.
    pub llm: Option<Arc<dyn LlmClient>>,
    /// LLM-backed enricher for single-token analysis.
    pub analyst: Option<Arc<dyn Enricher>>,
    pub chat_max_tokens: u32,
    /// Report of the most recent successful scan.
    pub last_report: RwLock<Option<ScanReport>>,
}

impl ServerState {
    pub fn new(
        scanner: Scanner,
        llm: Option<Arc<dyn LlmClient>>,
        analyst: Option<Arc<dyn Enricher>>,
        chat_max_tokens: u32,
    ) -> Self {
        Self {
            scanner,
            llm,
            analyst,
            chat_max_tokens,
            last_report: RwLock::new(None),
        }
    }
}

pub type AppState = Arc<ServerState>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub holders: Option<u64>,
}

impl AnalyzeRequest {
    fn into_item(self) -> RawItem {
        let mut item = RawItem::new(format!("adhoc:{}", self.symbol), self.name, self.symbol);
        if let Some(market_cap) = self.market_cap {
            item.set("market_cap", market_cap);
        }
        if let Some(holders) = self.holders {
            item.set("holder_count", holders);
        }
        item
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/scan
pub async fn scan(State(state): State<AppState>) -> Result<Json<Batch>, ApiError> {
    match state.scanner.scan_with_report().await {
        Ok((batch, report)) => {
            *state.last_report.write().await = Some(report);
            Ok(Json(batch))
        }
        Err(e) => {
            error!(error = %e, "Scan error");
            Err(e.into())
        }
    }
}

/// GET /api/scan/report
pub async fn scan_report(State(state): State<AppState>) -> Result<Json<ScanReport>, ApiError> {
    state
        .last_report
        .read()
        .await
        .clone()
        .map(Json)
        .ok_or(ApiError::NoReport)
}

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let llm = state.llm.as_ref().ok_or(ApiError::LlmUnavailable)?;

    let message = req.message.trim();
    if message.is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".into()));
    }

    let response = llm
        .complete(&chat_prompt(message), state.chat_max_tokens)
        .await
        .map_err(|e| {
            error!(error = %e, "Chat error");
            ApiError::Llm(format!("{e:#}"))
        })?;

    Ok(Json(ChatResponse { response }))
}

/// POST /api/analyze
pub async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<Assessment>, ApiError> {
    let analyst = state.analyst.as_ref().ok_or(ApiError::LlmUnavailable)?;

    if req.name.trim().is_empty() && req.symbol.trim().is_empty() {
        return Err(ApiError::BadRequest("name or symbol is required".into()));
    }

    let item = req.into_item();
    let assessment = analyst.assess(&item).await.map_err(|e| {
        error!(error = %e, token = %item, "Analysis error");
        ApiError::from(e)
    })?;

    info!(
        token = %item,
        rating = %assessment.rating,
        score = ?assessment.primary_score(),
        "Token analysed"
    );
    Ok(Json(assessment))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_request_camel_case() {
        let req: AnalyzeRequest = serde_json::from_str(
            r#"{"name": "Dog Hat", "symbol": "WIF", "marketCap": 1200.5, "holders": 88}"#,
        )
        .unwrap();
        let item = req.into_item();
        assert_eq!(item.mint, "adhoc:WIF");
        assert_eq!(item.market_cap(), Some(1200.5));
        assert_eq!(item.holder_count(), Some(88));
    }

    #[test]
    fn test_analyze_request_optional_stats() {
        let req: AnalyzeRequest = serde_json::from_str(r#"{"symbol": "WIF"}"#).unwrap();
        let item = req.into_item();
        assert!(item.name().is_empty());
        assert!(item.market_cap().is_none());
        assert!(!item.fields.contains_key("market_cap"));
    }

    #[test]
    fn test_chat_response_serializes() {
        let json = serde_json::to_string(&ChatResponse { response: "hodl".into() }).unwrap();
        assert_eq!(json, r#"{"response":"hodl"}"#);
    }
}
