use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument};

use super::lists::{self, RegistryList};
use super::totals::{recompute_totals, Totals, TOTALS_FIELD};
use crate::document::{Document, DocumentName, DocumentStore};
use crate::errors::{ServiceError, StoreError};

/// Result of an id-targeted mutation. A missing target is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// The saved registry document.
    Applied(Document),
    /// No record with that id; nothing was saved.
    NotFoundInList,
}

/// Read-modify-write operations on the registry document.
///
/// Each call reads the current document, mutates a private copy, refreshes
/// totals and saves. Calls are not serialized against each other.
#[derive(Clone)]
pub struct RegistryService {
    store: Arc<DocumentStore>,
}

impl RegistryService {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get_registry(&self) -> Result<Document, ServiceError> {
        Ok(self.store.get_document(DocumentName::Registry).await?)
    }

    /// Totals computed from the stored lists, not read from the stored `totals` field.
    pub async fn totals(&self) -> Result<Totals, ServiceError> {
        let doc = self.get_registry().await?;
        Ok(recompute_totals(&doc)?)
    }

    pub async fn list_records(&self, list: RegistryList) -> Result<Vec<Value>, ServiceError> {
        let mut doc = self.get_registry().await?;
        Ok(std::mem::take(list_mut(&mut doc, list)?))
    }

    pub async fn get_record(&self, list: RegistryList, id: &str) -> Result<Option<Value>, ServiceError> {
        let records = self.list_records(list).await?;
        Ok(lists::find_by_id(&records, id).cloned())
    }

    #[instrument(skip(self, record), fields(list = %list))]
    pub async fn add_record(&self, list: RegistryList, record: Value) -> Result<Document, ServiceError> {
        validate_record(&record)?;
        if lists::record_id(&record).map_or(true, str::is_empty) {
            return Err(ServiceError::validation("record must carry a non-empty string \"id\""));
        }

        let mut doc = self.get_registry().await?;
        lists::insert(list_mut(&mut doc, list)?, record);
        let saved = self.commit(doc).await?;
        info!(list = %list, "registry_record_added");
        Ok(saved)
    }

    #[instrument(skip(self, record), fields(list = %list))]
    pub async fn update_record(
        &self,
        list: RegistryList,
        id: &str,
        record: Value,
    ) -> Result<MutationOutcome, ServiceError> {
        validate_record(&record)?;

        let mut doc = self.get_registry().await?;
        if !lists::replace_by_id(list_mut(&mut doc, list)?, id, record) {
            debug!(list = %list, id, "update target not found");
            return Ok(MutationOutcome::NotFoundInList);
        }
        let saved = self.commit(doc).await?;
        info!(list = %list, id, "registry_record_updated");
        Ok(MutationOutcome::Applied(saved))
    }

    #[instrument(skip(self), fields(list = %list))]
    pub async fn delete_record(&self, list: RegistryList, id: &str) -> Result<MutationOutcome, ServiceError> {
        let mut doc = self.get_registry().await?;
        if !lists::delete_by_id(list_mut(&mut doc, list)?, id) {
            debug!(list = %list, id, "delete target not found");
            return Ok(MutationOutcome::NotFoundInList);
        }
        let saved = self.commit(doc).await?;
        info!(list = %list, id, "registry_record_deleted");
        Ok(MutationOutcome::Applied(saved))
    }

    async fn commit(&self, mut doc: Document) -> Result<Document, ServiceError> {
        refresh_totals(&mut doc)?;
        Ok(self.store.save_document(DocumentName::Registry, doc).await?)
    }
}

/// Recompute totals and store them in the document's `totals` field.
pub fn refresh_totals(doc: &mut Document) -> Result<Totals, StoreError> {
    let totals = recompute_totals(doc)?;
    let value = serde_json::to_value(&totals).map_err(|e| StoreError::Encode(e.to_string()))?;
    doc.insert(TOTALS_FIELD.to_string(), value);
    Ok(totals)
}

/// The named list inside `doc`, created empty if the field is absent.
/// Updating in place keeps the field's position in the document.
fn list_mut(doc: &mut Document, list: RegistryList) -> Result<&mut Vec<Value>, StoreError> {
    doc.entry(list.field())
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| StoreError::Parse(format!("registry field {} is not an array", list.field())))
}

/// Record payloads must be JSON objects; their shape is otherwise free.
pub fn validate_record(record: &Value) -> Result<(), ServiceError> {
    if record.is_object() {
        Ok(())
    } else {
        Err(ServiceError::validation("record must be a JSON object"))
    }
}
