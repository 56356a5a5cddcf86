//! API error types with IntoResponse
//!
//! Every failure becomes `{"success": false, "error": "..."}` with a status
//! picked from the failure category.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use wikidb_store::{BusError, ServiceError};

use crate::validation::ValidationError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Payload or path failed validation (400)
    Validation(ValidationError),

    /// Body is not JSON of the expected shape (400)
    BadPayload(String),

    /// No page with this id or name (404)
    NotFound { resource: &'static str, id: String },

    /// Page service failure (409/503/504/500 by category)
    Service(ServiceError),
}

impl ApiError {
    pub fn page_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            resource: "page",
            id: id.to_string(),
        }
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::BadPayload(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                format!("There is no {} with ID {}", resource, id),
            ),
            Self::Service(err) => match err {
                ServiceError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
                ServiceError::ResourceExhausted(msg) => {
                    tracing::warn!("Page store exhausted: {}", msg);
                    (StatusCode::SERVICE_UNAVAILABLE, "page store is busy".into())
                }
                ServiceError::Transport(BusError::Timeout { .. }) => {
                    tracing::warn!("Page store timeout: {}", err);
                    (StatusCode::GATEWAY_TIMEOUT, "page store timed out".into())
                }
                ServiceError::Transport(_) => {
                    tracing::error!("Page store unreachable: {}", err);
                    (StatusCode::SERVICE_UNAVAILABLE, "page store unavailable".into())
                }
                ServiceError::Storage(_) | ServiceError::InvalidRequest(_) => {
                    // Log the actual error, return generic message
                    tracing::error!("Page store error: {}", err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "an internal error occurred".into(),
                    )
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let body = Json(json!({
            "success": false,
            "error": message
        }));
        (status, body).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadPayload(rejection.body_text())
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self::Service(e)
    }
}
