//! Request-level error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::error::LungscanError;

/// Errors a handler can surface to the client.
///
/// Quota exhaustion is not represented here: a rate limit rejection is a
/// normal outcome, built as a response directly by the handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No usable caller identity
    #[error("Unauthorized")]
    Unauthorized,

    /// Malformed request payload
    #[error("{0}")]
    BadRequest(&'static str),

    /// Requested record does not exist for this caller
    #[error("Not found")]
    NotFound,

    /// Anything that should not leak details to the client
    #[error("Internal server error")]
    Internal(#[from] LungscanError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(err) => {
                error!(error = %err, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
