//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use flamewatch_domain::error::{FlameWatchError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`FlameWatchError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(FlameWatchError);

impl From<FlameWatchError> for ApiError {
    fn from(err: FlameWatchError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            FlameWatchError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            FlameWatchError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            FlameWatchError::Conflict(err) => (StatusCode::CONFLICT, err.to_string()),
            FlameWatchError::Transport(err) => {
                tracing::warn!(error = %err, "transport unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "transport unavailable".to_string(),
                )
            }
            FlameWatchError::InvariantViolation(err) => {
                tracing::error!(error = %err, "invariant violation");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            FlameWatchError::Storage(err) => {
                tracing::error!(error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
