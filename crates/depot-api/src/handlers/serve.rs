//! Content retrieval.
//!
//! One wildcard route covers both path shapes:
//!
//! - `/{backend}/{id}/{filename}`
//! - `/{backend}/{processor}/{arg...}/{id}/{filename}`
//!
//! The filename's extension, when mapped, decides the response content type.
//! Plain retrievals stream in configured chunks; a processor buffers the
//! content, transforms it, and the response length is recomputed from the
//! output.

use crate::error::HttpError;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use depot_core::media_type;
use depot_storage::{StorageError, StoredFile};
use std::sync::Arc;

struct ServeRequest<'a> {
    processor: Option<&'a str>,
    args: Vec<String>,
    id: &'a str,
    filename: &'a str,
}

/// Split the wildcard tail into its route shape. Returns `None` for shapes
/// the route table does not define.
fn parse_tail(tail: &str) -> Option<ServeRequest<'_>> {
    let segments: Vec<&str> = tail.split('/').filter(|s| !s.is_empty()).collect();
    match segments.len() {
        2 => Some(ServeRequest {
            processor: None,
            args: Vec::new(),
            id: segments[0],
            filename: segments[1],
        }),
        n if n >= 3 => Some(ServeRequest {
            processor: Some(segments[0]),
            args: segments[1..n - 2].iter().map(|s| s.to_string()).collect(),
            id: segments[n - 2],
            filename: segments[n - 1],
        }),
        _ => None,
    }
}

pub async fn serve(
    State(state): State<Arc<AppState>>,
    Path((backend_name, tail)): Path<(String, String)>,
) -> Result<Response, HttpError> {
    let request = parse_tail(&tail).ok_or(HttpError::NotFound)?;

    let entry = state.backends.get(&backend_name).ok_or(HttpError::NotFound)?;

    // An unknown processor and an unknown id are indistinguishable from the
    // outside; resolve the processor before touching storage.
    let processor = match request.processor {
        Some(name) => Some(state.processors.get(name).ok_or(HttpError::NotFound)?),
        None => None,
    };

    let file = match entry.backend.get(request.id).await {
        Ok(file) => file,
        Err(StorageError::NotFound(_)) | Err(StorageError::InvalidId(_)) => {
            return Err(HttpError::NotFound);
        }
        Err(e) => return Err(e.into()),
    };

    let content_type = media_type::content_type_for_filename(request.filename)
        .unwrap_or("application/octet-stream");

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, "inline");
    if let Some(origin) = &state.config.allow_origin {
        builder = builder.header(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }

    let response = match processor {
        Some(processor) => {
            let data = read_fully(file).await?;
            let output = processor.process(data, &request.args).await?;
            tracing::debug!(
                id = %request.id,
                processor = request.processor.unwrap_or_default(),
                output_bytes = output.len(),
                "serving processed content"
            );
            builder
                .header(header::CONTENT_LENGTH, output.len() as u64)
                .body(Body::from(output))
        }
        None => {
            tracing::debug!(id = %request.id, size_bytes = file.size(), "serving content");
            builder
                .header(header::CONTENT_LENGTH, file.size())
                .body(Body::from_stream(
                    file.into_stream(state.config.read_chunk_size),
                ))
        }
    };

    response.map_err(|e| HttpError::Internal(e.to_string()))
}

async fn read_fully(file: StoredFile) -> Result<bytes::Bytes, HttpError> {
    file.read_to_bytes()
        .await
        .map_err(|e| HttpError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_shape() {
        let parsed = parse_tail("abc123/hello.txt").unwrap();
        assert!(parsed.processor.is_none());
        assert_eq!(parsed.id, "abc123");
        assert_eq!(parsed.filename, "hello.txt");
    }

    #[test]
    fn test_parse_processor_shape() {
        let parsed = parse_tail("reverse/abc123/hello").unwrap();
        assert_eq!(parsed.processor, Some("reverse"));
        assert!(parsed.args.is_empty());
        assert_eq!(parsed.id, "abc123");

        let parsed = parse_tail("concat/foo/bar/abc123/hello").unwrap();
        assert_eq!(parsed.processor, Some("concat"));
        assert_eq!(parsed.args, vec!["foo".to_string(), "bar".to_string()]);
        assert_eq!(parsed.id, "abc123");
        assert_eq!(parsed.filename, "hello");
    }

    #[test]
    fn test_parse_rejects_short_shapes() {
        assert!(parse_tail("").is_none());
        assert!(parse_tail("only-one").is_none());
    }
}
