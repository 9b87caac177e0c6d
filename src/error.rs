use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::system::MetricsError;

/// Unified error type for the wallboard service.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    // ── Auth Errors ─────────────────────────────────────────────────────
    #[error("Authentication required")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("PKCE verifier missing. Please retry login.")]
    MissingVerifier,

    // ── Provider Errors ─────────────────────────────────────────────────
    #[error("OAuth provider error: {0}")]
    ProviderError(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("No refresh token")]
    NoRefreshToken,

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    #[error("Weather unavailable")]
    WeatherUnavailable,

    // ── Internal ────────────────────────────────────────────────────────
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Shutdown failed: {0}")]
    ShutdownFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<MetricsError> for DashboardError {
    fn from(e: MetricsError) -> Self {
        tracing::error!("Metrics error: {e}");
        DashboardError::Internal(e.to_string())
    }
}

impl From<std::io::Error> for DashboardError {
    fn from(e: std::io::Error) -> Self {
        DashboardError::Storage(e.to_string())
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            DashboardError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            DashboardError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            DashboardError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            DashboardError::MissingVerifier => (StatusCode::BAD_REQUEST, "missing_verifier"),
            DashboardError::ProviderError(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
            DashboardError::RefreshFailed(_) => (StatusCode::UNAUTHORIZED, "refresh_failed"),
            DashboardError::NoRefreshToken => {
                (StatusCode::INTERNAL_SERVER_ERROR, "no_refresh_token")
            }
            DashboardError::InvalidResponse(_) => (StatusCode::BAD_GATEWAY, "invalid_response"),
            DashboardError::WeatherUnavailable => {
                (StatusCode::INTERNAL_SERVER_ERROR, "weather_unavailable")
            }
            DashboardError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            DashboardError::ShutdownFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "shutdown_failed")
            }
            DashboardError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
