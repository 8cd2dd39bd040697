use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::storage::{BlobStore, FilesystemConfig, StorageError, StoredObject};

/// Serves objects from a directory tree; keys are paths relative to it.
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn new(config: &FilesystemConfig) -> Self {
        Self {
            root: config.directory.clone(),
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !is_plain {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FilesystemStore {
    async fn fetch(&self, key: &str) -> Result<StoredObject, StorageError> {
        let path = self.resolve(key)?;
        debug!("Reading {:?}", path);

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let bytes = tokio::fs::read(&path).await?;

        Ok(StoredObject {
            bytes,
            content_type: None,
        })
    }

    fn name(&self) -> &str {
        "filesystem"
    }
}
