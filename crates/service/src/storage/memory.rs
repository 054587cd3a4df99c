use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::BlobBackend;
use crate::errors::StoreError;

/// In-memory blob storage backed by a `RwLock<HashMap>`.
///
/// Used as a test double and for throwaway local runs.
#[derive(Default)]
pub struct MemoryBackend {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a key directly, bypassing the document store.
    pub async fn put_raw(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.blobs.write().await.insert(key.to_string(), bytes.into());
    }

    pub async fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.read().await.get(key).cloned()
    }
}

#[async_trait]
impl BlobBackend for MemoryBackend {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.blobs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(key))
    }

    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.blobs.write().await.insert(key.to_string(), bytes);
        Ok(())
    }
}
