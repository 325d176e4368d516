//! Filesystem blob store.
//!
//! Objects live under `<root>/objects/<path>`; their content types under
//! `<root>/types/<path>`. Paths are relative, `/`-separated, and may not
//! contain `.` or `..` segments.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Result, StoreError};
use crate::traits::{BlobObject, BlobStore};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Blob store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, area: &str, path: &str) -> Result<PathBuf> {
        if path.is_empty() || path.starts_with('/') || path.contains('\\') || path.contains('\0')
        {
            return Err(StoreError::Blob(format!("invalid blob path: {:?}", path)));
        }
        let mut out = self.root.join(area);
        for segment in path.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(StoreError::Blob(format!("invalid blob path: {:?}", path)));
            }
            out.push(segment);
        }
        Ok(out)
    }
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn write_creating_parent(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, data).await?;
    Ok(())
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<()> {
        let object = self.resolve("objects", path)?;
        let meta = self.resolve("types", path)?;

        write_creating_parent(&object, &data).await?;
        write_creating_parent(&meta, content_type.as_bytes()).await?;

        tracing::debug!(path, size = data.len(), "blob stored");
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<BlobObject>> {
        let object = self.resolve("objects", path)?;
        let data = match tokio::fs::read(&object).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let meta = self.resolve("types", path)?;
        let content_type = match tokio::fs::read_to_string(&meta).await {
            Ok(ct) => ct,
            Err(e) if e.kind() == ErrorKind::NotFound => DEFAULT_CONTENT_TYPE.to_string(),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(BlobObject {
            data: Bytes::from(data),
            content_type,
        }))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        remove_if_exists(&self.resolve("objects", path)?).await?;
        remove_if_exists(&self.resolve("types", path)?).await?;
        Ok(())
    }
}
