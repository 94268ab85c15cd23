//! HTTP error response conversion.
//!
//! Domain errors collapse onto the small response surface this protocol
//! defines: missing backends, ids, processors, and route shapes are all the
//! same `404 not found`; infrastructure failures are a short 500 with the
//! detail kept in the log, never in the body.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use depot_processing::ProcessError;
use depot_storage::StorageError;

pub const TEXT_PLAIN_UTF8: &str = "text/plain;charset=utf-8";

#[derive(Debug)]
pub enum HttpError {
    NotFound,
    Internal(String),
}

impl From<StorageError> for HttpError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) | StorageError::InvalidId(_) => HttpError::NotFound,
            other => HttpError::Internal(other.to_string()),
        }
    }
}

impl From<ProcessError> for HttpError {
    fn from(err: ProcessError) -> Self {
        HttpError::Internal(err.to_string())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        match self {
            HttpError::NotFound => (
                StatusCode::NOT_FOUND,
                [(header::CONTENT_TYPE, TEXT_PLAIN_UTF8)],
                "not found",
            )
                .into_response(),
            HttpError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(header::CONTENT_TYPE, TEXT_PLAIN_UTF8)],
                    "error",
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_not_found_maps_to_404() {
        let err: HttpError = StorageError::NotFound("abc".to_string()).into();
        assert!(matches!(err, HttpError::NotFound));

        let err: HttpError = StorageError::InvalidId("../x".to_string()).into();
        assert!(matches!(err, HttpError::NotFound));
    }

    #[test]
    fn test_storage_failure_maps_to_internal() {
        let err: HttpError = StorageError::Backend("disk on fire".to_string()).into();
        assert!(matches!(err, HttpError::Internal(_)));
    }
}
