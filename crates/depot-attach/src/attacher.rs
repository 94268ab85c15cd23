//! Attachment lifecycle state machine.
//!
//! An attacher tracks one attachment across two backends: content is staged
//! in the cache tier by [`Attacher::cache`] (or [`Attacher::retrieve`] from a
//! token, or [`Attacher::download`] from a URL), then promoted to the store
//! tier by [`Attacher::store`]. State is derived from the `cache_id` (staged)
//! and `id` (persisted) fields; there is no separate state enum. Metadata is
//! mirrored onto an optional host record via [`AttachmentFields`].

use crate::record::AttachmentFields;
use depot_core::{media_type, UploadToken};
use depot_storage::{Backend, StorageError, StoredFile, UploadSource};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// A single validation failure, collected into the attacher's fault set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationFault {
    #[error("invalid extension")]
    InvalidExtension,
    #[error("invalid content type")]
    InvalidContentType,
    #[error("too large")]
    TooLarge,
    #[error("download failed")]
    DownloadFailed,
}

#[derive(Debug, Error)]
pub enum AttachError {
    #[error("validation failed: {0:?}")]
    Invalid(Vec<ValidationFault>),

    #[error("download failed: {0}")]
    Download(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Input accepted by [`Attacher::set`]: a retrieval token from a previous
/// round-trip, or fresh content.
pub enum AttachValue {
    Token(String),
    Source(UploadSource),
}

impl From<String> for AttachValue {
    fn from(token: String) -> Self {
        AttachValue::Token(token)
    }
}

impl From<&str> for AttachValue {
    fn from(token: &str) -> Self {
        AttachValue::Token(token.to_string())
    }
}

impl From<UploadSource> for AttachValue {
    fn from(source: UploadSource) -> Self {
        AttachValue::Source(source)
    }
}

pub struct Attacher {
    cache: Arc<dyn Backend>,
    store: Arc<dyn Backend>,
    allowed_extensions: Option<Vec<String>>,
    allowed_content_types: Option<Vec<String>>,
    raise_errors: bool,
    record: Option<Box<dyn AttachmentFields + Send>>,
    id: Option<String>,
    cache_id: Option<String>,
    size: Option<u64>,
    content_type: Option<String>,
    filename: Option<String>,
    errors: Vec<ValidationFault>,
    remove: Option<String>,
}

impl Attacher {
    pub fn new(cache: Arc<dyn Backend>, store: Arc<dyn Backend>) -> Self {
        Attacher {
            cache,
            store,
            allowed_extensions: None,
            allowed_content_types: None,
            raise_errors: true,
            record: None,
            id: None,
            cache_id: None,
            size: None,
            content_type: None,
            filename: None,
            errors: Vec::new(),
            remove: None,
        }
    }

    pub fn allow_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    pub fn allow_content_types<I, S>(mut self, content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_content_types = Some(content_types.into_iter().map(Into::into).collect());
        self
    }

    /// Collect validation failures into the fault set instead of returning
    /// `Err(AttachError::Invalid)` from `cache`/`download`.
    pub fn collect_errors(mut self) -> Self {
        self.raise_errors = false;
        self
    }

    /// Attach a host record; metadata reads fall through to it and every
    /// metadata write is mirrored into it.
    pub fn with_record(mut self, record: Box<dyn AttachmentFields + Send>) -> Self {
        self.record = Some(record);
        self
    }

    /// Hand the host record back to the caller.
    pub fn into_record(self) -> Option<Box<dyn AttachmentFields + Send>> {
        self.record
    }

    // --- metadata accessors ---

    pub fn id(&self) -> Option<String> {
        self.id
            .clone()
            .or_else(|| self.record.as_ref().and_then(|r| r.attachment_id()))
    }

    pub fn cache_id(&self) -> Option<&str> {
        self.cache_id.as_deref()
    }

    pub fn size(&self) -> Option<u64> {
        self.size
            .or_else(|| self.record.as_ref().and_then(|r| r.attachment_size()))
    }

    pub fn content_type(&self) -> Option<String> {
        self.content_type
            .clone()
            .or_else(|| self.record.as_ref().and_then(|r| r.attachment_content_type()))
    }

    pub fn filename(&self) -> Option<String> {
        self.filename
            .clone()
            .or_else(|| self.record.as_ref().and_then(|r| r.attachment_filename()))
    }

    pub fn extension(&self) -> Option<String> {
        let filename = self.filename()?;
        Path::new(&filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    pub fn errors(&self) -> &[ValidationFault] {
        &self.errors
    }

    /// Whether content is currently staged in the cache tier.
    pub fn cached(&self) -> bool {
        self.cache_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Whether content has been promoted to the store tier.
    pub fn stored(&self) -> bool {
        self.id().is_some_and(|id| !id.is_empty())
    }

    // --- removal flag ---

    /// Set the removal flag from a form field. `""`, `"0"` and `"false"` are
    /// falsey; anything else requests deletion on the next [`Attacher::store`].
    pub fn set_remove(&mut self, value: impl Into<String>) {
        self.remove = Some(value.into());
    }

    pub fn remove_requested(&self) -> bool {
        !matches!(
            self.remove.as_deref().map(str::trim),
            None | Some("") | Some("0") | Some("false")
        )
    }

    // --- lifecycle operations ---

    /// Polymorphic entry point: strings are retrieval tokens, anything else
    /// is fresh content for the cache path.
    pub async fn set(&mut self, value: impl Into<AttachValue>) -> Result<(), AttachError> {
        match value.into() {
            AttachValue::Token(token) => {
                self.retrieve(&token);
                Ok(())
            }
            AttachValue::Source(source) => self.cache(source).await,
        }
    }

    /// Restore staged state from a token produced by [`Attacher::data`].
    /// Malformed tokens are silently ignored; the token is trusted and the
    /// underlying bytes are not re-read.
    pub fn retrieve(&mut self, raw: &str) {
        let Some(token) = UploadToken::parse(raw) else {
            tracing::debug!("ignoring malformed upload token");
            return;
        };
        self.cache_id = Some(token.id);
        self.write_metadata(token.size, token.content_type, token.filename);
    }

    /// Stage content in the cache tier. Metadata is recorded from the source
    /// before validation; invalid content is never uploaded.
    pub async fn cache(&mut self, source: UploadSource) -> Result<(), AttachError> {
        let content_type = source
            .content_type()
            .map(str::to_string)
            .or_else(|| {
                source
                    .filename()
                    .and_then(media_type::content_type_for_filename)
                    .map(str::to_string)
            });
        let filename = source.filename().map(str::to_string);
        self.write_metadata(Some(source.size()), content_type, filename);

        if self.valid() {
            let uploaded = self.cache.upload(source).await?;
            tracing::debug!(cache_id = %uploaded.id(), "content staged in cache");
            self.cache_id = Some(uploaded.id().to_string());
            Ok(())
        } else if self.raise_errors {
            Err(AttachError::Invalid(self.errors.clone()))
        } else {
            Ok(())
        }
    }

    /// Fetch a remote resource and stage it like [`Attacher::cache`].
    ///
    /// A redirect loop is caller input rather than an infrastructure fault:
    /// it is recorded as a [`ValidationFault::DownloadFailed`] and does not
    /// escalate. Other fetch failures record the same fault and escalate
    /// unless error raising is suppressed; failures past the fetch always
    /// propagate.
    pub async fn download(&mut self, url: &str) -> Result<(), AttachError> {
        if url.is_empty() {
            return Ok(());
        }

        let response = match reqwest::get(url).await {
            Ok(response) => response,
            Err(e) if e.is_redirect() => {
                tracing::warn!(url = %url, error = %e, "redirect loop while downloading");
                self.errors = vec![ValidationFault::DownloadFailed];
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "download request failed");
                self.errors = vec![ValidationFault::DownloadFailed];
                return if self.raise_errors {
                    Err(AttachError::Download(e.to_string()))
                } else {
                    Ok(())
                };
            }
        };

        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "download returned error status");
                self.errors = vec![ValidationFault::DownloadFailed];
                return if self.raise_errors {
                    Err(AttachError::Download(e.to_string()))
                } else {
                    Ok(())
                };
            }
        };

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_string());
        let filename = response
            .url()
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .map(|name| name.to_string());
        let declared_size = response.content_length();

        let data = response
            .bytes()
            .await
            .map_err(|e| AttachError::Download(e.to_string()))?;
        let size = declared_size.unwrap_or(data.len() as u64);

        self.write_metadata(Some(size), content_type, filename);

        if self.valid() {
            let uploaded = self.cache.upload(UploadSource::from_bytes(data)).await?;
            tracing::debug!(cache_id = %uploaded.id(), url = %url, "downloaded content staged");
            self.cache_id = Some(uploaded.id().to_string());
        }
        Ok(())
    }

    /// Promote staged content to the store tier, or delete everything when
    /// removal was requested. A no-op when nothing is staged, so invoking it
    /// twice never loses the stored id.
    pub async fn store(&mut self) -> Result<(), AttachError> {
        if self.remove_requested() {
            self.delete_content(true).await?;
        } else if self.cached() {
            let cache_id = self.cache_id.clone().expect("cached() checked");
            let staged = self.cache.get(&cache_id).await?;
            let promoted = self.store.upload(staged.into_source()).await?;
            let new_id = promoted.id().to_string();

            self.cache.delete(&cache_id).await?;
            self.cache_id = None;
            // A content-addressed store may hand the replacement the same id
            // as the content it replaces; only delete ids that differ.
            if let Some(old_id) = self
                .id()
                .filter(|id| !id.is_empty() && *id != new_id)
            {
                self.store.delete(&old_id).await?;
            }
            self.write_id(Some(new_id.clone()));
            tracing::info!(id = %new_id, "attachment promoted to store");
        }
        Ok(())
    }

    /// Remove content from whichever tiers hold it and clear both ids.
    pub async fn delete(&mut self) -> Result<(), StorageError> {
        self.delete_content(true).await
    }

    /// Recompute the fault set from the allow-lists and the cache tier's
    /// advisory size cap, and report whether it is empty. Never cached:
    /// re-run after any metadata change.
    pub fn valid(&mut self) -> bool {
        let extension_ok = match &self.allowed_extensions {
            None => true,
            Some(allowed) => self
                .extension()
                .is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext))),
        };
        let content_type_ok = match &self.allowed_content_types {
            None => true,
            Some(allowed) => self
                .content_type()
                .is_some_and(|ct| allowed.iter().any(|a| a.eq_ignore_ascii_case(&ct))),
        };
        let size_ok = match (self.cache.max_size(), self.size()) {
            (Some(max), Some(size)) => size < max,
            _ => true,
        };

        self.errors.clear();
        if !extension_ok {
            self.errors.push(ValidationFault::InvalidExtension);
        }
        if !content_type_ok {
            self.errors.push(ValidationFault::InvalidContentType);
        }
        if !size_ok {
            self.errors.push(ValidationFault::TooLarge);
        }
        self.errors.is_empty()
    }

    /// Token for round-tripping staged content through an untrusted client.
    /// Only available while content is staged and valid.
    pub fn data(&mut self) -> Option<String> {
        if !self.valid() {
            return None;
        }
        let cache_id = self.cache_id.clone().filter(|id| !id.is_empty())?;
        let token = UploadToken {
            id: cache_id,
            size: self.size(),
            content_type: self.content_type(),
            filename: self.filename(),
        };
        Some(token.to_json())
    }

    /// Advisory hint string for client-side file pickers: content types when
    /// configured, else dotted extensions.
    pub fn accept(&self) -> Option<String> {
        if let Some(types) = &self.allowed_content_types {
            Some(types.join(","))
        } else {
            self.allowed_extensions.as_ref().map(|extensions| {
                extensions
                    .iter()
                    .map(|e| format!(".{e}"))
                    .collect::<Vec<_>>()
                    .join(",")
            })
        }
    }

    /// Fetch whichever tier currently holds the content, cache first.
    pub async fn get(&self) -> Result<Option<StoredFile>, StorageError> {
        if self.cached() {
            let cache_id = self.cache_id.as_deref().expect("cached() checked");
            return Ok(Some(self.cache.get(cache_id).await?));
        }
        if let Some(id) = self.id().filter(|id| !id.is_empty()) {
            return Ok(Some(self.store.get(&id).await?));
        }
        Ok(None)
    }

    // --- internal write paths ---

    async fn delete_content(&mut self, rewrite_metadata: bool) -> Result<(), StorageError> {
        if self.cached() {
            let cache_id = self.cache_id.take().expect("cached() checked");
            self.cache.delete(&cache_id).await?;
        }
        self.cache_id = None;
        if let Some(id) = self.id().filter(|id| !id.is_empty()) {
            self.store.delete(&id).await?;
        }
        self.write_id(None);
        if rewrite_metadata {
            self.write_metadata(None, None, None);
        }
        Ok(())
    }

    fn write_id(&mut self, value: Option<String>) {
        self.id = value.clone();
        if let Some(record) = self.record.as_deref_mut() {
            record.set_attachment_id(value);
        }
    }

    fn write_metadata(
        &mut self,
        size: Option<u64>,
        content_type: Option<String>,
        filename: Option<String>,
    ) {
        self.size = size;
        self.content_type = content_type.clone();
        self.filename = filename.clone();
        if let Some(record) = self.record.as_deref_mut() {
            record.set_attachment_size(size);
            record.set_attachment_content_type(content_type);
            record.set_attachment_filename(filename);
        }
    }
}
