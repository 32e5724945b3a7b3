//! Custom error types for the mentorship service

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use common::error::{CacheError, DatabaseError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::models::SessionStatus;

/// Typed failure of an engine operation
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed input or a date that is not in the future
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Unknown session or user
    #[error("{0} not found")]
    NotFound(String),

    /// Status change not allowed from the current status
    #[error("Cannot {action} a session that is {status}")]
    InvalidTransition {
        status: SessionStatus,
        action: &'static str,
    },

    /// Caller supplied a stale version
    #[error("Version conflict: expected {expected}, stored {actual}")]
    Conflict { expected: i64, actual: i64 },

    /// Caller is not allowed to perform the action
    #[error("Forbidden: {0}")]
    Authorization(String),

    /// Join attempted outside the join window
    #[error("Session can be joined between {opens_at} and {closes_at}")]
    NotReady {
        opens_at: DateTime<Utc>,
        closes_at: DateTime<Utc>,
    },

    /// Database error
    #[error(transparent)]
    Storage(#[from] DatabaseError),

    /// Cache error
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl EngineError {
    /// Short machine-readable error kind
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation",
            EngineError::NotFound(_) => "not_found",
            EngineError::InvalidTransition { .. } => "invalid_transition",
            EngineError::Conflict { .. } => "conflict",
            EngineError::Authorization(_) => "authorization",
            EngineError::NotReady { .. } => "not_ready",
            EngineError::Storage(_) => "storage",
            EngineError::Cache(_) => "cache",
        }
    }

    /// Whether the caller may retry the same request later
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            EngineError::Conflict { .. } | EngineError::NotReady { .. }
        )
    }

    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::Conflict { .. } => StatusCode::CONFLICT,
            EngineError::Authorization(_) => StatusCode::FORBIDDEN,
            // 425 Too Early
            EngineError::NotReady { .. } => {
                StatusCode::from_u16(425).unwrap_or(StatusCode::CONFLICT)
            }
            EngineError::Storage(_) | EngineError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Type alias for engine results
pub type EngineResult<T> = Result<T, EngineError>;

/// Custom error type for the HTTP layer
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or invalid access token
    #[error("Unauthorized")]
    Unauthorized,

    /// Body, query string or path that could not be decoded
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Engine error
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::MalformedRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::MalformedRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
            ),
            ApiError::MalformedRequest(detail) => {
                let err = EngineError::Validation(detail);
                (err.status_code(), err.code(), err.to_string())
            }
            ApiError::Engine(err @ (EngineError::Storage(_) | EngineError::Cache(_))) => {
                error!("Request failed: {}", err);
                (err.status_code(), err.code(), "Internal server error".to_string())
            }
            ApiError::Engine(err) => (err.status_code(), err.code(), err.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
