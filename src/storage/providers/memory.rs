use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::storage::{BlobStore, StorageError, StoredObject};

/// In-process store, mostly useful for tests and local experiments.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, bytes: Vec<u8>, content_type: Option<&str>) {
        let object = StoredObject {
            bytes,
            content_type: content_type.map(str::to_string),
        };
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(key.into(), object);
        }
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn fetch(&self, key: &str) -> Result<StoredObject, StorageError> {
        let objects = self
            .objects
            .read()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
