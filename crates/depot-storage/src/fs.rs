//! Local filesystem backend.
//!
//! Each id is one file under the root directory, sharded by the first two
//! characters of the id to bound directory fan-out. Writes land in a
//! temporary path first and are renamed into place, so a concurrent `get`
//! never observes a partially written file.

use crate::traits::{Backend, IdStream, StorageError, StorageResult, StoredFile, UploadSource};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::PathBuf;
use tokio::fs;
use uuid::Uuid;

const TMP_DIR: &str = "tmp";

/// Local filesystem storage backend with random ids.
#[derive(Clone, Debug)]
pub struct FsBackend {
    root: PathBuf,
    max_size: Option<u64>,
}

impl FsBackend {
    /// Create a backend rooted at `root`, creating the directory tree if
    /// needed.
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(TMP_DIR)).await?;
        Ok(FsBackend {
            root,
            max_size: None,
        })
    }

    /// Set the advisory upload size cap.
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Ids are generated here and by other backends sharing the directory
    /// layout; anything else (path separators, dot segments) never resolves.
    fn valid_id(id: &str) -> bool {
        id.len() >= 4
            && id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }

    fn path_for(&self, id: &str) -> Option<PathBuf> {
        if !Self::valid_id(id) {
            return None;
        }
        Some(self.root.join(&id[..2]).join(id))
    }

    async fn list_shard(shard: PathBuf) -> Vec<StorageResult<String>> {
        let mut ids = Vec::new();
        let mut entries = match fs::read_dir(&shard).await {
            Ok(entries) => entries,
            Err(e) => return vec![Err(e.into())],
        };
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    if let Some(name) = entry.file_name().to_str() {
                        ids.push(Ok(name.to_string()));
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    ids.push(Err(e.into()));
                    break;
                }
            }
        }
        ids
    }
}

#[async_trait]
impl Backend for FsBackend {
    async fn upload(&self, source: UploadSource) -> StorageResult<StoredFile> {
        let id = Uuid::new_v4().simple().to_string();
        let tmp_path = self.root.join(TMP_DIR).join(&id);
        let final_path = self.path_for(&id).expect("generated id is well-formed");

        let mut reader = source.into_reader();
        let mut file = fs::File::create(&tmp_path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "failed to create {}: {}",
                tmp_path.display(),
                e
            ))
        })?;

        let written = match tokio::io::copy(&mut reader, &mut file).await {
            Ok(written) => written,
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::UploadFailed(format!(
                    "failed to write {}: {}",
                    tmp_path.display(),
                    e
                )));
            }
        };

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("failed to sync {}: {}", tmp_path.display(), e))
        })?;
        drop(file);

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&tmp_path, &final_path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "failed to move {} into place: {}",
                tmp_path.display(),
                e
            ))
        })?;

        tracing::debug!(id = %id, size_bytes = written, "filesystem upload committed");

        let file = fs::File::open(&final_path).await?;
        Ok(StoredFile::new(id, written, file))
    }

    async fn get(&self, id: &str) -> StorageResult<StoredFile> {
        let path = self
            .path_for(id)
            .ok_or_else(|| StorageError::InvalidId(id.to_string()))?;

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();

        Ok(StoredFile::new(id, size, file))
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        // Malformed ids cannot name stored content, so there is nothing to do.
        let Some(path) = self.path_for(id) else {
            return Ok(());
        };
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(id = %id, "filesystem delete");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, id: &str) -> StorageResult<bool> {
        let Some(path) = self.path_for(id) else {
            return Ok(false);
        };
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn each_id(&self) -> StorageResult<IdStream> {
        let mut shards = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_str() == Some(TMP_DIR) {
                continue;
            }
            if entry.file_type().await?.is_dir() {
                shards.push(entry.path());
            }
        }
        shards.sort();

        let stream = futures::stream::iter(shards)
            .then(Self::list_shard)
            .map(futures::stream::iter)
            .flatten();

        Ok(Box::pin(stream))
    }

    fn max_size(&self) -> Option<u64> {
        self.max_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use tempfile::tempdir;

    async fn backend(dir: &tempfile::TempDir) -> FsBackend {
        FsBackend::new(dir.path()).await.unwrap()
    }

    #[tokio::test]
    async fn test_upload_get_round_trip() {
        let dir = tempdir().unwrap();
        let backend = backend(&dir).await;

        let uploaded = backend
            .upload(UploadSource::from_bytes("hello world"))
            .await
            .unwrap();
        let id = uploaded.id().to_string();
        assert_eq!(uploaded.size(), 11);

        let fetched = backend.get(&id).await.unwrap();
        assert_eq!(fetched.size(), 11);
        assert_eq!(fetched.read_to_bytes().await.unwrap(), "hello world");
    }

    #[tokio::test]
    async fn test_upload_handle_is_readable() {
        let dir = tempdir().unwrap();
        let backend = backend(&dir).await;

        let uploaded = backend
            .upload(UploadSource::from_bytes("direct read"))
            .await
            .unwrap();
        assert_eq!(uploaded.read_to_bytes().await.unwrap(), "direct read");
    }

    #[tokio::test]
    async fn test_ids_are_sharded_on_disk() {
        let dir = tempdir().unwrap();
        let backend = backend(&dir).await;

        let uploaded = backend
            .upload(UploadSource::from_bytes("x"))
            .await
            .unwrap();
        let id = uploaded.id().to_string();

        let sharded = dir.path().join(&id[..2]).join(&id);
        assert!(sharded.exists());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let backend = backend(&dir).await;

        let result = backend.get("00000000000000000000000000000000").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let backend = backend(&dir).await;

        let uploaded = backend
            .upload(UploadSource::from_bytes("gone soon"))
            .await
            .unwrap();
        let id = uploaded.id().to_string();

        backend.delete(&id).await.unwrap();
        assert!(matches!(
            backend.get(&id).await,
            Err(StorageError::NotFound(_))
        ));

        // Repeat deletes and deletes of ids that never existed are fine.
        backend.delete(&id).await.unwrap();
        backend.delete("neverexisted1234").await.unwrap();
        backend.delete("../../etc/passwd").await.unwrap();
    }

    #[tokio::test]
    async fn test_traversal_ids_never_resolve() {
        let dir = tempdir().unwrap();
        let backend = backend(&dir).await;

        assert!(matches!(
            backend.get("../../etc/passwd").await,
            Err(StorageError::InvalidId(_))
        ));
        assert!(!backend.exists("../../etc/passwd").await.unwrap());
        assert!(!backend.exists("ab/cd").await.unwrap());
    }

    #[tokio::test]
    async fn test_exists() {
        let dir = tempdir().unwrap();
        let backend = backend(&dir).await;

        let uploaded = backend
            .upload(UploadSource::from_bytes("here"))
            .await
            .unwrap();

        assert!(backend.exists(uploaded.id()).await.unwrap());
        assert!(!backend
            .exists("00000000000000000000000000000000")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_each_id_enumerates_everything() {
        let dir = tempdir().unwrap();
        let backend = backend(&dir).await;

        let mut expected = Vec::new();
        for content in ["one", "two", "three"] {
            let uploaded = backend
                .upload(UploadSource::from_bytes(content))
                .await
                .unwrap();
            expected.push(uploaded.id().to_string());
        }

        let mut ids: Vec<String> = backend.each_id().await.unwrap().try_collect().await.unwrap();
        ids.sort();
        expected.sort();
        assert_eq!(ids, expected);

        // Restartable: a fresh enumeration sees the same set.
        let again: Vec<String> = backend.each_id().await.unwrap().try_collect().await.unwrap();
        assert_eq!(again.len(), 3);
    }

    #[tokio::test]
    async fn test_max_size_is_advisory() {
        let dir = tempdir().unwrap();
        let backend = FsBackend::new(dir.path()).await.unwrap().with_max_size(4);

        assert_eq!(backend.max_size(), Some(4));

        // Oversized content still streams through without error; enforcement
        // belongs to the attacher's validation.
        let uploaded = backend
            .upload(UploadSource::from_bytes("way past the cap"))
            .await
            .unwrap();
        assert_eq!(uploaded.size(), 16);
    }

    #[tokio::test]
    async fn test_concurrent_gets_of_same_id() {
        let dir = tempdir().unwrap();
        let backend = backend(&dir).await;

        let uploaded = backend
            .upload(UploadSource::from_bytes("shared"))
            .await
            .unwrap();
        let id = uploaded.id().to_string();

        let (a, b) = tokio::join!(backend.get(&id), backend.get(&id));
        assert_eq!(a.unwrap().read_to_bytes().await.unwrap(), "shared");
        assert_eq!(b.unwrap().read_to_bytes().await.unwrap(), "shared");
    }
}
