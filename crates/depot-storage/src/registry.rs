//! Named backend collection.
//!
//! Maps short keys ("cache", "store") to backend instances, with a
//! per-backend flag for anonymous direct upload over HTTP. Built once at
//! startup and read-only afterwards; tests build throwaway registries.

use crate::traits::Backend;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct BackendEntry {
    pub backend: Arc<dyn Backend>,
    /// Whether anonymous `POST /{name}` uploads may target this backend.
    pub direct_upload: bool,
}

#[derive(Clone, Default)]
pub struct BackendRegistry {
    entries: HashMap<String, BackendEntry>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        mut self,
        name: impl Into<String>,
        backend: Arc<dyn Backend>,
        direct_upload: bool,
    ) -> Self {
        self.entries.insert(
            name.into(),
            BackendEntry {
                backend,
                direct_upload,
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&BackendEntry> {
        self.entries.get(name)
    }

    pub fn backend(&self, name: &str) -> Option<Arc<dyn Backend>> {
        self.entries.get(name).map(|entry| entry.backend.clone())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BackendEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }
}
