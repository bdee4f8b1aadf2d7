//! Transfer seam used by the processing pipeline.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::client::ObjectStorageClient;
use crate::error::StorageResult;

/// Moves media between the remote store and the local filesystem.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Whether remote operations can be attempted at all.
    fn is_configured(&self) -> bool;

    /// Fetch the object `url` refers to into `dest_dir`; returns the local path.
    async fn download_to(&self, url: &str, dest_dir: &Path) -> StorageResult<PathBuf>;

    /// Store a local file under `key`; returns its public URL.
    async fn upload_path(&self, path: &Path, key: &str, content_type: &str)
        -> StorageResult<String>;
}

#[async_trait]
impl MediaStore for ObjectStorageClient {
    fn is_configured(&self) -> bool {
        ObjectStorageClient::is_configured(self)
    }

    async fn download_to(&self, url: &str, dest_dir: &Path) -> StorageResult<PathBuf> {
        ObjectStorageClient::download_to(self, url, dest_dir).await
    }

    async fn upload_path(
        &self,
        path: &Path,
        key: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        ObjectStorageClient::upload_path(self, path, key, content_type).await
    }
}
