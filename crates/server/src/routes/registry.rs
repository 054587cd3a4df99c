use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use service::document::Document;
use service::registry::{MutationOutcome, RegistryList, Totals};

use super::auth::ServerState;
use crate::errors::JsonApiError;

fn parse_list(raw: &str) -> Result<RegistryList, JsonApiError> {
    Ok(raw.parse::<RegistryList>()?)
}

/// Full registry document.
pub async fn get_registry(State(state): State<ServerState>) -> Result<Json<Document>, JsonApiError> {
    Ok(Json(state.registry.get_registry().await?))
}

/// Totals recomputed from the stored lists.
pub async fn get_totals(State(state): State<ServerState>) -> Result<Json<Totals>, JsonApiError> {
    Ok(Json(state.registry.totals().await?))
}

pub async fn list_records(
    State(state): State<ServerState>,
    Path(list): Path<String>,
) -> Result<Json<Vec<Value>>, JsonApiError> {
    let list = parse_list(&list)?;
    Ok(Json(state.registry.list_records(list).await?))
}

pub async fn get_record(
    State(state): State<ServerState>,
    Path((list, id)): Path<(String, String)>,
) -> Result<Json<Value>, JsonApiError> {
    let list = parse_list(&list)?;
    state
        .registry
        .get_record(list, &id)
        .await?
        .map(Json)
        .ok_or_else(|| JsonApiError::record_not_found(list, &id))
}

/// Append a record; responds with the saved document.
pub async fn add_record(
    State(state): State<ServerState>,
    Path(list): Path<String>,
    Json(record): Json<Value>,
) -> Result<(StatusCode, Json<Document>), JsonApiError> {
    let list = parse_list(&list)?;
    let saved = state.registry.add_record(list, record).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn update_record(
    State(state): State<ServerState>,
    Path((list, id)): Path<(String, String)>,
    Json(record): Json<Value>,
) -> Result<Json<Document>, JsonApiError> {
    let list = parse_list(&list)?;
    match state.registry.update_record(list, &id, record).await? {
        MutationOutcome::Applied(saved) => Ok(Json(saved)),
        MutationOutcome::NotFoundInList => Err(JsonApiError::record_not_found(list, &id)),
    }
}

pub async fn delete_record(
    State(state): State<ServerState>,
    Path((list, id)): Path<(String, String)>,
) -> Result<Json<Document>, JsonApiError> {
    let list = parse_list(&list)?;
    match state.registry.delete_record(list, &id).await? {
        MutationOutcome::Applied(saved) => Ok(Json(saved)),
        MutationOutcome::NotFoundInList => Err(JsonApiError::record_not_found(list, &id)),
    }
}
