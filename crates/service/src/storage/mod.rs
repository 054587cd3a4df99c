//! Blob backends holding the JSON documents.
//!
//! Every backend exposes the same byte-level contract: `read` returns the
//! whole content stored at a key, `write` replaces it entirely. Backends are
//! disjoint stores; nothing is mirrored between them.

pub mod gcs;
pub mod local;
pub mod memory;
pub mod token;

use std::sync::Arc;

use async_trait::async_trait;
use configs::{StorageConfig, StorageMode};

use crate::errors::StoreError;

pub use gcs::{GcsBackend, GcsClient};
pub use local::LocalFsBackend;
pub use memory::MemoryBackend;

/// Byte-level storage for whole documents.
///
/// `read` fails with [`StoreError::NotFound`] when the key is absent and with
/// [`StoreError::Backend`] for any other I/O fault. `write` fully replaces the
/// prior content. No retries happen at this level.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Human readable location, e.g. `gs://bucket` or a directory path.
    fn describe(&self) -> String;

    /// Indentation used when documents are serialized for this backend.
    fn json_indent(&self) -> usize {
        2
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;
}

/// Build the backend selected by configuration. Called once at startup.
pub fn backend_from_config(cfg: &StorageConfig) -> Result<Arc<dyn BlobBackend>, StoreError> {
    match cfg.mode {
        StorageMode::Local => Ok(Arc::new(LocalFsBackend::new(cfg.local_root.clone()))),
        StorageMode::Gcs => {
            let tokens = token::provider_from_config(&cfg.gcs);
            let client = GcsClient::new(cfg.gcs.endpoint.as_deref(), tokens)?;
            Ok(Arc::new(GcsBackend::new(client, cfg.gcs.bucket.clone())))
        }
    }
}
