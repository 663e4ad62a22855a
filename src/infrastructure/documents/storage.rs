//! Object storage backends for rendered documents

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::application::ports::{ObjectStorage, SinkError};

/// Writes objects below a root directory, one file per key
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `key` below the root, refusing absolute paths and `..`.
    fn path_for(&self, key: &str) -> Result<PathBuf, SinkError> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !safe {
            return Err(SinkError::Storage(format!("invalid object key '{key}'")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalFileStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, SinkError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;
        debug!(key, content_type, size = bytes.len(), "Object stored");
        Ok(key.to_string())
    }
}

/// Keeps objects in memory. Used when no document directory is configured
/// and in tests.
#[derive(Debug, Default)]
pub struct InMemoryObjectStorage {
    objects: DashMap<String, (String, Vec<u8>)>,
}

impl InMemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.get(key).map(|entry| entry.1.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, SinkError> {
        self.objects
            .insert(key.to_string(), (content_type.to_string(), bytes));
        Ok(key.to_string())
    }
}
