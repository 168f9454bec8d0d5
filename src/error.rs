//! Error taxonomy for ingestion and storage, with HTTP status mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failures of the durable event store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database rejected or could not complete an operation.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored payload column no longer parses as JSON.
    #[error("stored payload for event {id} is not valid JSON: {source}")]
    CorruptPayload {
        id: i64,
        #[source]
        source: serde_json::Error,
    },

    /// The payload could not be serialized for storage.
    #[error("failed to serialize payload: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Terminal outcomes of the ingestion pipeline other than success.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A signature was supplied and did not match the body.
    #[error("Invalid signature")]
    InvalidSignature,

    /// No signature was supplied while signatures are required.
    #[error("Missing signature")]
    MissingSignature,

    /// The body is not a JSON object.
    #[error("Invalid JSON: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    /// The accepted event could not be persisted.
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl IngestError {
    /// Stable machine-readable reason code returned to callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSignature => "invalid_signature",
            Self::MissingSignature => "missing_signature",
            Self::MalformedPayload(_) => "invalid_json",
            Self::Storage(_) => "storage_failure",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidSignature | Self::MissingSignature => StatusCode::UNAUTHORIZED,
            Self::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to callers; storage detail stays in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::Storage(_) => "Failed to store webhook event".to_string(),
            Self::MalformedPayload(_) => "Invalid JSON".to_string(),
            other => other.to_string(),
        }
    }
}

/// Error body: `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(self.code(), self.public_message());
        (self.status(), Json(body)).into_response()
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new("storage_failure", "Failed to read webhook events");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_error() -> serde_json::Error {
        serde_json::from_str::<serde_json::Value>("not json").unwrap_err()
    }

    #[test]
    fn authentication_failures_map_to_unauthorized() {
        assert_eq!(IngestError::InvalidSignature.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(IngestError::MissingSignature.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn malformed_payload_maps_to_bad_request() {
        let err = IngestError::MalformedPayload(json_error());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "invalid_json");
    }

    #[test]
    fn storage_failure_hides_internal_detail() {
        let err = IngestError::from(StoreError::Database(sqlx::Error::PoolClosed));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.public_message().contains("pool"));
    }

    #[test]
    fn response_carries_status() {
        let response = IngestError::InvalidSignature.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
