use std::sync::Arc;

use configs::StorageConfig;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::{Document, DocumentKeys, DocumentName, LAST_UPDATED};
use crate::errors::StoreError;
use crate::storage::{backend_from_config, BlobBackend};

/// Reads and writes whole documents through one blob backend.
///
/// The backend is fixed at construction. Nothing is cached between calls:
/// every `get_document` goes back to the backend. Concurrent read-modify-write
/// cycles on the same document are not serialized, so the later save wins.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use service::document::{DocumentKeys, DocumentName, DocumentStore};
/// use service::storage::MemoryBackend;
///
/// let backend = Arc::new(MemoryBackend::new());
/// tokio_test::block_on(backend.put_raw("registry.json", r#"{"carbonRegistries": []}"#));
/// let store = DocumentStore::new(backend, DocumentKeys::default());
/// let doc = tokio_test::block_on(store.get_document(DocumentName::Registry)).unwrap();
/// assert!(doc["carbonRegistries"].is_array());
/// ```
#[derive(Clone)]
pub struct DocumentStore {
    backend: Arc<dyn BlobBackend>,
    keys: DocumentKeys,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn BlobBackend>, keys: DocumentKeys) -> Self {
        Self { backend, keys }
    }

    pub fn from_config(cfg: &StorageConfig) -> Result<Self, StoreError> {
        Ok(Self::new(backend_from_config(cfg)?, DocumentKeys::from(cfg)))
    }

    pub fn describe(&self) -> String {
        self.backend.describe()
    }

    pub fn keys(&self) -> &DocumentKeys {
        &self.keys
    }

    #[instrument(skip(self), fields(document = %name))]
    pub async fn get_document(&self, name: DocumentName) -> Result<Document, StoreError> {
        let key = self.keys.key_for(name);
        let bytes = self.backend.read(key).await.map_err(|e| {
            warn!(key, kind = e.kind(), err = %e, "document read failed");
            e
        })?;
        decode(key, &bytes)
    }

    /// Stamp `lastUpdated` with today's local date and overwrite the stored
    /// document. Returns the document exactly as written.
    #[instrument(skip(self, document), fields(document = %name))]
    pub async fn save_document(&self, name: DocumentName, mut document: Document) -> Result<Document, StoreError> {
        let key = self.keys.key_for(name);
        document.insert(LAST_UPDATED.to_string(), Value::String(today()));
        let bytes = encode(&document, self.backend.json_indent())?;
        let size = bytes.len();
        self.backend.write(key, bytes).await?;
        info!(key, bytes = size, backend = %self.backend.describe(), "document_saved");
        Ok(document)
    }
}

/// Current process-local calendar date as `YYYY-MM-DD`.
pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

fn decode(key: &str, bytes: &[u8]) -> Result<Document, StoreError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Parse(format!(
            "{key}: expected a JSON object at top level, found {}",
            json_type(&other)
        ))),
        Err(e) => Err(StoreError::Parse(format!("{key}: {e}"))),
    }
}

/// Pretty-print with the given indent. Non-ASCII text is written as-is.
fn encode(document: &Document, indent: usize) -> Result<Vec<u8>, StoreError> {
    let indent = vec![b' '; indent];
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(&indent));
    document.serialize(&mut ser).map_err(|e| StoreError::Encode(e.to_string()))?;
    Ok(out)
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
