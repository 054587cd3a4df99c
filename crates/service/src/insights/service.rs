use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};

use crate::document::{Document, DocumentName, DocumentStore, LAST_UPDATED};
use crate::errors::ServiceError;

/// Whole-document and per-section writes to the insights document.
#[derive(Clone)]
pub struct InsightsService {
    store: Arc<DocumentStore>,
}

impl InsightsService {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get_insights(&self) -> Result<Document, ServiceError> {
        Ok(self.store.get_document(DocumentName::Insights).await?)
    }

    /// Replace the stored document with `document`. The stored copy must
    /// already exist; this never creates the insights document.
    #[instrument(skip(self, document))]
    pub async fn replace_insights(&self, document: Value) -> Result<Document, ServiceError> {
        let Value::Object(document) = document else {
            return Err(ServiceError::validation("insights document must be a JSON object"));
        };
        // existence check: a replace against a missing document is NotFound
        self.store.get_document(DocumentName::Insights).await?;
        let saved = self.store.save_document(DocumentName::Insights, document).await?;
        info!(fields = saved.len(), "insights_replaced");
        Ok(saved)
    }

    /// Replace one top-level field, leaving the rest of the document untouched.
    #[instrument(skip(self, value))]
    pub async fn update_section(&self, section: &str, value: Value) -> Result<Document, ServiceError> {
        if section.trim().is_empty() || section == LAST_UPDATED {
            return Err(ServiceError::validation(format!("section {section:?} cannot be written")));
        }
        let mut doc = self.get_insights().await?;
        doc.insert(section.to_string(), value);
        let saved = self.store.save_document(DocumentName::Insights, doc).await?;
        info!(section, "insights_section_updated");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentKeys;
    use crate::errors::StoreError;
    use crate::storage::MemoryBackend;
    use serde_json::json;

    async fn seeded(insights: Option<Value>) -> InsightsService {
        let backend = Arc::new(MemoryBackend::new());
        if let Some(v) = insights {
            backend.put_raw("insights.json", v.to_string()).await;
        }
        InsightsService::new(Arc::new(DocumentStore::new(backend, DocumentKeys::default())))
    }

    #[tokio::test]
    async fn section_update_keeps_other_fields_and_order() -> Result<(), anyhow::Error> {
        let svc = seeded(Some(json!({"headline": "x", "markets": [1], "notes": "n"}))).await;
        let saved = svc.update_section("markets", json!([1, 2, 3])).await?;
        let keys: Vec<&str> = saved.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["headline", "markets", "notes", "lastUpdated"]);
        assert_eq!(saved["markets"], json!([1, 2, 3]));
        Ok(())
    }

    #[tokio::test]
    async fn replace_requires_object_and_existing_document() {
        let svc = seeded(None).await;
        let err = svc.replace_insights(json!({"a": 1})).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::NotFound { .. })));

        let svc = seeded(Some(json!({}))).await;
        let err = svc.replace_insights(json!("text")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn replace_stamps_last_updated() -> Result<(), anyhow::Error> {
        let svc = seeded(Some(json!({"old": true}))).await;
        let saved = svc.replace_insights(json!({"new": true, "lastUpdated": "2001-01-01"})).await?;
        assert!(saved.get("old").is_none());
        assert_eq!(saved[LAST_UPDATED], json!(crate::document::store::today()));
        Ok(())
    }

    #[tokio::test]
    async fn last_updated_section_is_reserved() {
        let svc = seeded(Some(json!({}))).await;
        assert!(matches!(
            svc.update_section(LAST_UPDATED, json!("2000-01-01")).await,
            Err(ServiceError::Validation(_))
        ));
    }
}
