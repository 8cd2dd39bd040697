pub mod config;
pub mod error;
pub mod providers;

pub use config::*;
pub use error::*;

use async_trait::async_trait;
use std::sync::Arc;

/// An object as fetched from the store.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    /// Content type recorded by the store, if it keeps one
    pub content_type: Option<String>,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<StoredObject, StorageError>;
    fn name(&self) -> &str;
}

pub type DynBlobStore = Arc<dyn BlobStore>;

pub async fn create_store(config: &StorageConfig) -> Result<DynBlobStore, StorageError> {
    match config {
        StorageConfig::Filesystem(fs_config) => Ok(Arc::new(
            providers::filesystem::FilesystemStore::new(fs_config),
        )),
        StorageConfig::S3(s3_config) => {
            Ok(Arc::new(providers::s3::S3Store::new(s3_config).await?))
        }
    }
}
