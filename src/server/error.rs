//! HTTP error responses
//!
//! Every failure leaves the server as `{"detail": "<message>"}` with the
//! matching status code.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::KvError;

/// An error returned by a handler
#[derive(Debug)]
pub struct ApiError {
    /// Response status
    pub status: StatusCode,

    /// Human-readable message
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, detail)
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl From<KvError> for ApiError {
    fn from(err: KvError) -> Self {
        if err.is_not_found() {
            ApiError::not_found(err.to_string())
        } else if err.is_validation() {
            ApiError::bad_request(err.to_string())
        } else {
            tracing::error!("Storage failure: {}", err);
            ApiError::internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "detail": self.detail }));

        if self.status == StatusCode::UNAUTHORIZED {
            (self.status, [(header::WWW_AUTHENTICATE, "Basic")], body).into_response()
        } else {
            (self.status, body).into_response()
        }
    }
}
