//! Anonymous direct upload.
//!
//! `POST /{backend}` accepts one multipart `file` field and is only served
//! for backends flagged as direct-uploadable; everything else is a 404, the
//! same as any other unrecognized route.

use crate::error::HttpError;
use crate::state::AppState;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use depot_storage::UploadSource;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: String,
    pub size: u64,
}

pub async fn direct_upload(
    State(state): State<Arc<AppState>>,
    Path(backend_name): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, HttpError> {
    let entry = state.backends.get(&backend_name).ok_or(HttpError::NotFound)?;
    if !entry.direct_upload {
        return Err(HttpError::NotFound);
    }

    let mut multipart = multipart.map_err(|_| HttpError::NotFound)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| HttpError::NotFound)?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| HttpError::Internal(e.to_string()))?;

        let mut source = UploadSource::from_bytes(data);
        if let Some(filename) = filename {
            source = source.with_filename(filename);
        }
        if let Some(content_type) = content_type {
            source = source.with_content_type(content_type);
        }

        let uploaded = entry.backend.upload(source).await?;
        tracing::info!(
            backend = %backend_name,
            id = %uploaded.id(),
            size_bytes = uploaded.size(),
            "direct upload accepted"
        );

        return Ok(Json(UploadResponse {
            id: uploaded.id().to_string(),
            size: uploaded.size(),
        })
        .into_response());
    }

    Err(HttpError::NotFound)
}
