//! Read API handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::error;

use crate::api::query::top_products_limit;
use crate::api::rows::JsonRow;
use crate::api::ApiState;
use crate::entity::Entity;
use crate::error::PipelineError;
use crate::pagination::Pagination;

/// Filtered list response
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub count: usize,
    pub data: Vec<JsonRow>,
}

/// Analytics response
#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub data: Vec<JsonRow>,
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = match &self {
            PipelineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Root endpoint with API information
pub async fn root() -> Json<Value> {
    let endpoints: serde_json::Map<String, Value> = Entity::ALL
        .iter()
        .map(|e| (e.table_name().to_string(), Value::String(format!("/{}", e))))
        .collect();

    Json(json!({
        "message": "Retail Data API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": endpoints,
    }))
}

pub async fn list_rows(
    State(state): State<ApiState>,
    entity: Entity,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ListResponse>, PipelineError> {
    let page = Pagination::parse(
        params.get("limit").map(String::as_str),
        params.get("offset").map(String::as_str),
    )?;

    let data = state.repository.list(entity, &params, page).await?;
    Ok(Json(ListResponse {
        count: data.len(),
        data,
    }))
}

pub async fn get_row(
    State(state): State<ApiState>,
    entity: Entity,
    Path(id): Path<String>,
) -> Result<Json<JsonRow>, PipelineError> {
    let id = id.trim().parse::<i64>().map_err(|_| {
        PipelineError::Validation(format!("{} must be an integer, got '{}'", entity.primary_key(), id))
    })?;

    let row = state.repository.get(entity, id).await?;
    Ok(Json(row))
}

/// Total sales grouped by store
pub async fn sales_by_store(
    State(state): State<ApiState>,
) -> Result<Json<DataResponse>, PipelineError> {
    let data = state.repository.sales_by_store().await?;
    Ok(Json(DataResponse { data }))
}

/// Top products by transaction count
pub async fn top_products(
    State(state): State<ApiState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<DataResponse>, PipelineError> {
    let limit = top_products_limit(params.get("limit").map(String::as_str))?;
    let data = state.repository.top_products(limit).await?;
    Ok(Json(DataResponse { data }))
}
