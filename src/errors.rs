//! Error types for the codex core.
//!
//! This module defines a unified error enumeration used across object
//! storage, commit/ref persistence, repository operations, export, the
//! plugin host, and the publish job engine. It integrates with `thiserror`
//! to provide rich `Display` implementations and error source chaining.
//!
//! Notes:
//! - Each variant carries contextual details via its message payload.
//! - A merge `Conflict` is reported as data (see `repository::MergeOutcome`),
//!   not through this enum — it is not an error per the spec.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
/// Unified error enumeration for the codex core.
///
/// - Used across the object/commit/ref stores, the repository, export, the
///   plugin host, and the job engine.
/// - Implements `std::error::Error` via `thiserror`.
pub enum CodexError {
    /// Addressed entity absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Stored bytes disagree with their claimed hash, or a commit's
    /// referential closure is violated during a read that requires it.
    #[error("integrity error: {0}")]
    IntegrityError(String),

    /// Stored bytes cannot be decoded as the expected shape.
    #[error("malformed data: {0}")]
    MalformedData(String),

    /// A commit references a parent hash that does not resolve.
    #[error("missing parent: {0}")]
    MissingParent(String),

    /// A commit references an object hash that does not resolve.
    #[error("missing object: {0}")]
    MissingObject(String),

    /// Caller payload is ill-formed or missing required fields.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Plugin dispatch or job execution exceeded its deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Plugin name unknown at dispatch time.
    #[error("not registered: {0}")]
    NotRegistered(String),

    /// Transient backend failure, retryable at the caller's discretion.
    #[error("storage error: {0}")]
    StorageError(String),

    /// I/O error from the underlying filesystem.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodexError {
    pub fn not_found(what: impl Into<String>) -> Self {
        CodexError::NotFound(what.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        CodexError::InvalidInput(msg.into())
    }

    /// Maps this error kind to the HTTP status code from spec §7.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CodexError::NotFound(_) | CodexError::NotRegistered(_) => StatusCode::NOT_FOUND,
            CodexError::InvalidInput(_)
            | CodexError::MissingParent(_)
            | CodexError::MissingObject(_) => StatusCode::BAD_REQUEST,
            CodexError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CodexError::IntegrityError(_)
            | CodexError::MalformedData(_)
            | CodexError::StorageError(_)
            | CodexError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for CodexError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = CodexError::not_found("abc123");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_input_maps_to_400() {
        let err = CodexError::invalid_input("missing field");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn timeout_maps_to_504() {
        let err = CodexError::Timeout("plugin dispatch".into());
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }
}
