//! Named JSON documents and the store that reads and writes them whole.

pub mod store;

use std::fmt;

use configs::StorageConfig;
use serde_json::{Map, Value};

pub use store::DocumentStore;

/// A decoded document: a JSON object whose key order is kept as stored.
pub type Document = Map<String, Value>;

/// Field stamped with the save date on every write.
pub const LAST_UPDATED: &str = "lastUpdated";

/// The documents this service knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentName {
    Registry,
    Insights,
}

impl DocumentName {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentName::Registry => "registry",
            DocumentName::Insights => "insights",
        }
    }
}

impl fmt::Display for DocumentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend key for each document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentKeys {
    pub registry: String,
    pub insights: String,
}

impl DocumentKeys {
    pub fn key_for(&self, name: DocumentName) -> &str {
        match name {
            DocumentName::Registry => &self.registry,
            DocumentName::Insights => &self.insights,
        }
    }
}

impl Default for DocumentKeys {
    fn default() -> Self {
        Self { registry: "registry.json".into(), insights: "insights.json".into() }
    }
}

impl From<&StorageConfig> for DocumentKeys {
    fn from(cfg: &StorageConfig) -> Self {
        Self { registry: cfg.registry_key.clone(), insights: cfg.insights_key.clone() }
    }
}
