//! services/api/src/adapters/storage.rs
//!
//! Filesystem implementation of the `ObjectStoreService` port. Objects are
//! addressed by the relative path the core composes (owner id / document id /
//! filename) and live under a configurable root directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use quizforge_core::ports::{ObjectStoreService, PortError, PortResult};

/// An object store adapter backed by the local filesystem.
#[derive(Clone)]
pub struct FsStorageAdapter {
    root: PathBuf,
}

impl FsStorageAdapter {
    /// Creates a new `FsStorageAdapter` rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PortResult<PathBuf> {
        // Paths are composed by the core from UUIDs and an upload filename;
        // refuse anything that could escape the root.
        if Path::new(path)
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_)))
        {
            return Err(PortError::Persistence(format!(
                "refusing non-normal storage path {path:?}"
            )));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl ObjectStoreService for FsStorageAdapter {
    async fn put(&self, path: &str, bytes: &[u8], _content_type: &str) -> PortResult<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Persistence(e.to_string()))?;
        }
        fs::write(&full, bytes)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, path: &str) -> PortResult<()> {
        let full = self.resolve(path)?;
        fs::remove_file(&full)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_escaping_paths() {
        let store = FsStorageAdapter::new("/tmp/quizforge-test-store");
        let result = store.put("../outside", b"x", "application/pdf").await;
        assert!(matches!(result, Err(PortError::Persistence(_))));
    }

    #[tokio::test]
    async fn put_then_remove_roundtrip() {
        let root = std::env::temp_dir().join(format!("qf-store-{}", uuid::Uuid::new_v4()));
        let store = FsStorageAdapter::new(&root);

        store
            .put("owner/doc/file.pdf", b"%PDF-1.4", "application/pdf")
            .await
            .unwrap();
        assert!(root.join("owner/doc/file.pdf").exists());

        store.remove("owner/doc/file.pdf").await.unwrap();
        assert!(!root.join("owner/doc/file.pdf").exists());

        tokio::fs::remove_dir_all(&root).await.ok();
    }
}
