use crate::error::EngineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::error;

/// `{ "data": ... }` envelope used by every successful JSON response
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

pub fn data<T: Serialize>(data: T) -> Json<Data<T>> {
    Json(Data { data })
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Errors returned by HTTP handlers
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized,
    /// A store read failed; safe to retry
    Unavailable(String),
    Internal(String),
}

impl ApiError {
    /// Map a store write/read error, recovering domain errors carried inside.
    pub fn from_store(operation: &'static str, err: anyhow::Error) -> Self {
        match EngineError::from_store(operation, err) {
            EngineError::UpstreamReadFailure { operation, source } => {
                error!(operation, error = %format!("{:#}", source), "Store operation failed");
                ApiError::Internal(format!("{} failed", operation))
            }
            domain => domain.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            EngineError::InvalidArgument(msg) => ApiError::BadRequest(msg),
            EngineError::UpstreamReadFailure { .. } => {
                error!(error = %err, "Upstream read failed");
                ApiError::Unavailable(err.to_string())
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "{}", msg),
            ApiError::BadRequest(msg) => write!(f, "{}", msg),
            ApiError::Unauthorized => write!(f, "unauthorized"),
            ApiError::Unavailable(msg) => write!(f, "{}", msg),
            ApiError::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
