//! In-memory content-addressed backend.
//!
//! Ids are the SHA-256 of the content, so identical uploads deduplicate to
//! the same id. Used by tests and fixtures, and as the content-derived id
//! strategy the [`Backend`] contract permits.

use crate::traits::{Backend, IdStream, StorageError, StorageResult, StoredFile, UploadSource};
use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, RwLock};

#[derive(Clone, Default)]
pub struct MemoryBackend {
    files: Arc<RwLock<HashMap<String, Bytes>>>,
    max_size: Option<u64>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = Some(max_size);
        self
    }

    fn lock(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Bytes>> {
        self.files.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn upload(&self, source: UploadSource) -> StorageResult<StoredFile> {
        let data = source
            .read_to_bytes()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        let id = hex::encode(Sha256::digest(&data));
        let size = data.len() as u64;

        self.lock().insert(id.clone(), data.clone());
        tracing::debug!(id = %id, size_bytes = size, "memory upload committed");

        Ok(StoredFile::new(id, size, Cursor::new(data)))
    }

    async fn get(&self, id: &str) -> StorageResult<StoredFile> {
        let data = self
            .files
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        Ok(StoredFile::new(id, data.len() as u64, Cursor::new(data)))
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        self.lock().remove(id);
        Ok(())
    }

    async fn exists(&self, id: &str) -> StorageResult<bool> {
        Ok(self
            .files
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(id))
    }

    async fn each_id(&self) -> StorageResult<IdStream> {
        let ids: Vec<String> = self
            .files
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        Ok(Box::pin(futures::stream::iter(ids.into_iter().map(Ok))))
    }

    fn max_size(&self) -> Option<u64> {
        self.max_size
    }
}
