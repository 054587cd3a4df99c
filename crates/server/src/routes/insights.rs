use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use service::document::Document;

use super::auth::ServerState;
use crate::errors::JsonApiError;

pub async fn get_insights(State(state): State<ServerState>) -> Result<Json<Document>, JsonApiError> {
    Ok(Json(state.insights.get_insights().await?))
}

/// Replace the whole insights document.
pub async fn replace_insights(
    State(state): State<ServerState>,
    Json(document): Json<Value>,
) -> Result<Json<Document>, JsonApiError> {
    Ok(Json(state.insights.replace_insights(document).await?))
}

/// Replace one top-level section of the insights document.
pub async fn update_section(
    State(state): State<ServerState>,
    Path(section): Path<String>,
    Json(value): Json<Value>,
) -> Result<Json<Document>, JsonApiError> {
    Ok(Json(state.insights.update_section(&section, value).await?))
}
