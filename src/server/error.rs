//! API error type and its JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request cannot be processed as sent.
    #[error("{0}")]
    BadRequest(String),

    /// A model, embedding or vector-store call failed.
    #[error("{0}")]
    Upstream(#[from] whisper::Error),

    /// The blocking worker panicked or was cancelled.
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(err) => {
                tracing::error!(error = %err, "upstream call failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
