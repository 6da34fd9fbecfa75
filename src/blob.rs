//! Object storage for plan cover images.
//!
//! [`BlobStore`] is the seam to the storage backend. [`LocalBlobStore`] keeps objects
//! as files under a root directory and hands out URLs built from a configured prefix.

use crate::errors::{Error, Result};
use std::{
    future::Future,
    path::{Component, Path, PathBuf},
};
use tracing::{debug, instrument};

/// Namespace under which plan cover images are stored.
pub const PLAN_COVERS_PREFIX: &str = "plan_covers";

/// A store for binary objects addressed by relative paths.
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` at `path`, replacing any existing object, and returns a durable
    /// URL for it.
    fn put(&self, path: &str, bytes: &[u8]) -> impl Future<Output = Result<String>> + Send;

    /// Removes the object at `path`. Removing a missing object is not an error.
    fn delete(&self, path: &str) -> impl Future<Output = Result<()>> + Send;

    /// Maps a URL handed out by [`put`](Self::put) back to its object path. URLs this
    /// store did not produce map to `None`.
    fn object_path(&self, url: &str) -> Option<String>;
}

/// Blob store backed by a local directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    base_url: String,
}

impl LocalBlobStore {
    /// Creates a store rooted at `root` whose objects are served under `base_url`.
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Maps an object path to a file below the root, rejecting paths that would escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let well_formed = !path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !well_formed {
            return Err(Error::Blob {
                message: format!("Invalid object path {path:?}"),
            });
        }
        Ok(self.root.join(relative))
    }

    /// The URL an object at `path` is served under.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

impl BlobStore for LocalBlobStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<String> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        debug!("Stored object at {}", target.display());
        Ok(self.url_for(path))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn object_path(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.base_url)?
            .strip_prefix('/')
            .filter(|path| self.resolve(path).is_ok())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[tokio::test]
    async fn test_put_writes_file_and_returns_url() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = LocalBlobStore::new(dir.path(), "https://cdn.example.com/");

        let url = store.put("plan_covers/1_100.jpg", b"jpeg").await?;

        assert_eq!(url, "https://cdn.example.com/plan_covers/1_100.jpg");
        let stored = std::fs::read(dir.path().join("plan_covers/1_100.jpg"))?;
        assert_eq!(stored, b"jpeg");
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = LocalBlobStore::new(dir.path(), "file:///covers");
        store.put("a.jpg", b"x").await?;

        store.delete("a.jpg").await?;
        store.delete("a.jpg").await?;
        assert!(!dir.path().join("a.jpg").exists());
        Ok(())
    }

    #[test]
    fn test_object_path_only_for_own_urls() {
        let store = LocalBlobStore::new("/srv/blobs", "https://cdn.example.com");
        assert_eq!(
            store.object_path("https://cdn.example.com/plan_covers/1_100.jpg"),
            Some("plan_covers/1_100.jpg".to_string())
        );
        assert_eq!(store.object_path("https://elsewhere.com/plan_covers/1.jpg"), None);
        assert_eq!(store.object_path("https://cdn.example.com/../secret"), None);
        assert_eq!(store.object_path(""), None);
    }

    #[tokio::test]
    async fn test_paths_cannot_escape_root() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = LocalBlobStore::new(dir.path(), "file:///covers");

        for bad in ["../outside.jpg", "/etc/passwd", "", "plan_covers/../../x"] {
            let result = store.put(bad, b"x").await;
            assert!(matches!(result, Err(Error::Blob { .. })), "{bad} accepted");
        }
        Ok(())
    }
}
