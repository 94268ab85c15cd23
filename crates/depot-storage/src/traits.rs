//! Storage abstraction trait
//!
//! This module defines the [`Backend`] trait that all storage tiers implement,
//! together with the two value types that cross the boundary: [`UploadSource`]
//! (content on its way in) and [`StoredFile`] (content already committed).

use async_trait::async_trait;
use bytes::Bytes;
use depot_core::media_type;
use futures::Stream;
use std::io;
use std::path::Path;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::ReaderStream;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Lazy, finite enumeration of the ids held by a backend. Each call to
/// [`Backend::each_id`] produces a fresh enumeration.
pub type IdStream = Pin<Box<dyn Stream<Item = StorageResult<String>> + Send>>;

type ByteReader = Pin<Box<dyn AsyncRead + Send>>;

/// Content on its way into a backend: a declared size and a sequential
/// reader. End of stream is the reader returning zero bytes; the underlying
/// resource is released on drop.
pub struct UploadSource {
    size: u64,
    filename: Option<String>,
    content_type: Option<String>,
    reader: ByteReader,
}

impl UploadSource {
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        UploadSource {
            size: data.len() as u64,
            filename: None,
            content_type: None,
            reader: Box::pin(io::Cursor::new(data)),
        }
    }

    /// Open a file as an upload source. The filename is taken from the path
    /// and the content type guessed from its extension.
    pub async fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string());
        let content_type = filename
            .as_deref()
            .and_then(media_type::content_type_for_filename)
            .map(|ct| ct.to_string());
        Ok(UploadSource {
            size,
            filename,
            content_type,
            reader: Box::pin(file),
        })
    }

    pub fn from_reader(size: u64, reader: impl AsyncRead + Send + 'static) -> Self {
        UploadSource {
            size,
            filename: None,
            content_type: None,
            reader: Box::pin(reader),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Consume the source into its reader.
    pub fn into_reader(self) -> ByteReader {
        self.reader
    }

    /// Drain the source fully into memory.
    pub async fn read_to_bytes(mut self) -> io::Result<Bytes> {
        let mut buf = Vec::with_capacity(self.size as usize);
        self.reader.read_to_end(&mut buf).await?;
        Ok(Bytes::from(buf))
    }
}

impl std::fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSource")
            .field("size", &self.size)
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// A handle to content committed to a tier. Owned by the caller of
/// `get`/`upload`; the underlying resource is released when the handle (or a
/// stream made from it) is dropped, so an aborted response never leaks an
/// open file.
pub struct StoredFile {
    id: String,
    size: u64,
    reader: ByteReader,
}

impl StoredFile {
    pub fn new(id: impl Into<String>, size: u64, reader: impl AsyncRead + Send + 'static) -> Self {
        StoredFile {
            id: id.into(),
            size,
            reader: Box::pin(reader),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Drain the handle fully into memory.
    pub async fn read_to_bytes(mut self) -> io::Result<Bytes> {
        let mut buf = Vec::with_capacity(self.size as usize);
        self.reader.read_to_end(&mut buf).await?;
        Ok(Bytes::from(buf))
    }

    /// Turn the handle into a chunked byte stream for response bodies.
    pub fn into_stream(
        self,
        chunk_size: usize,
    ) -> Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>> {
        Box::pin(ReaderStream::with_capacity(self.reader, chunk_size))
    }

    /// Re-wrap the handle as an upload source, for moving content between
    /// tiers without buffering it.
    pub fn into_source(self) -> UploadSource {
        UploadSource {
            size: self.size,
            filename: None,
            content_type: None,
            reader: self.reader,
        }
    }
}

impl std::fmt::Debug for StoredFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredFile")
            .field("id", &self.id)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Uniform storage contract implemented by every tier.
///
/// Ids are assigned by the backend and resolve to identical bytes for the
/// lifetime of the backend instance. Reads for the same id are always safe to
/// run concurrently; a delete racing a get surfaces as not-found, never as
/// corruption.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Commit a source durably and assign it an id. The source is consumed in
    /// bounded chunks; `max_size` is advisory and never enforced here.
    async fn upload(&self, source: UploadSource) -> StorageResult<StoredFile>;

    /// Fetch content by id. Fails with [`StorageError::NotFound`] if no
    /// content exists for `id`.
    async fn get(&self, id: &str) -> StorageResult<StoredFile>;

    /// Remove content by id. Deleting a non-existent id is not an error.
    async fn delete(&self, id: &str) -> StorageResult<()>;

    async fn exists(&self, id: &str) -> StorageResult<bool>;

    /// Enumerate all ids. Maintenance tooling only, not the hot path.
    async fn each_id(&self) -> StorageResult<IdStream>;

    /// Advisory upload size cap in bytes; `None` means unbounded. Consulted
    /// by attacher validation, not enforced by the backend.
    fn max_size(&self) -> Option<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_upload_source_from_bytes() {
        let source = UploadSource::from_bytes("hello world")
            .with_filename("hello.txt")
            .with_content_type("text/plain");

        assert_eq!(source.size(), 11);
        assert_eq!(source.filename(), Some("hello.txt"));
        assert_eq!(source.content_type(), Some("text/plain"));
        assert_eq!(source.read_to_bytes().await.unwrap(), "hello world");
    }

    #[tokio::test]
    async fn test_upload_source_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        tokio::fs::write(&path, b"<html></html>").await.unwrap();

        let source = UploadSource::from_path(&path).await.unwrap();
        assert_eq!(source.size(), 13);
        assert_eq!(source.filename(), Some("page.html"));
        assert_eq!(source.content_type(), Some("text/html"));
    }

    #[tokio::test]
    async fn test_stored_file_chunked_stream() {
        let file = StoredFile::new("abc", 10, io::Cursor::new(b"0123456789".to_vec()));

        let chunks: Vec<_> = file
            .into_stream(4)
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].as_ref(), b"0123");
        assert_eq!(chunks[2].as_ref(), b"89");
    }

    #[tokio::test]
    async fn test_stored_file_into_source_preserves_bytes() {
        let file = StoredFile::new("abc", 5, io::Cursor::new(b"hello".to_vec()));
        let source = file.into_source();
        assert_eq!(source.size(), 5);
        assert_eq!(source.read_to_bytes().await.unwrap(), "hello");
    }
}
