//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::types::ScanError;

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Scan failed: {0}")]
    Upstream(String),

    #[error("AI backend not configured")]
    LlmUnavailable,

    #[error("AI response failed: {0}")]
    Llm(String),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("No scan has completed yet")]
    NoReport,
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        if err.is_fatal() {
            ApiError::Upstream(err.to_string())
        } else {
            ApiError::Analysis(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Upstream(_) | ApiError::Llm(_) | ApiError::Analysis(_) => StatusCode::BAD_GATEWAY,
            ApiError::LlmUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NoReport => StatusCode::NOT_FOUND,
        };

        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Upstream("x".into()).into_response().status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::LlmUnavailable.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ApiError::BadRequest("x".into()).into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NoReport.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_scan_error_conversion() {
        let api: ApiError = ScanError::UpstreamUnavailable("timeout".into()).into();
        assert!(matches!(api, ApiError::Upstream(_)));

        let api: ApiError = ScanError::malformed("M", "bad rating").into();
        assert!(matches!(api, ApiError::Analysis(_)));
    }
}
