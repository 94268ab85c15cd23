//! Request handlers.

pub mod serve;
pub mod upload;

use crate::error::TEXT_PLAIN_UTF8;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

/// Shared terminal response for every unrecognized route shape, backend, id
/// or processor.
pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, TEXT_PLAIN_UTF8)],
        "not found",
    )
        .into_response()
}
