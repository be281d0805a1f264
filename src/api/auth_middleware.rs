use super::error::ApiError;
use crate::auth::{verify_api_key, KeyError};
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;


/// State for the API key layer
pub struct ApiKeyState {
    /// Shared key; None disables the check
    pub api_key: Option<String>,
}

/// Authorize a request against the optional shared key.
///
/// Always Ok when no key is configured.
pub fn authorize_request(headers: &HeaderMap, api_key: Option<&str>) -> Result<(), KeyError> {
    match api_key {
        None => Ok(()),
        Some(expected) => verify_api_key(headers, expected),
    }
}

/// Middleware rejecting requests without the configured `x-api-key`.
pub async fn require_api_key(
    State(state): State<Arc<ApiKeyState>>,
    req: Request,
    next: Next,
) -> Response {
    if let Err(e) = authorize_request(req.headers(), state.api_key.as_deref()) {
        warn!(
            method = %req.method(),
            path = %req.uri().path(),
            reason = %e,
            "Rejected request"
        );
        return ApiError::Unauthorized.into_response();
    }
    next.run(req).await
}
