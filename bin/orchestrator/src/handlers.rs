use axum::{
    extract::{Path, Query, State},
    Json,
};
use orchestrator_store::types::{Item, ItemId, Stats};
use serde::{Deserialize, Serialize};

use crate::{errors::ApiError, state::AppState};

#[derive(Deserialize)]
pub struct TransferRequest {
    pub receiver: String,
    pub amount: String,
    pub memo: Option<String>,
    pub has_storage_deposit: Option<bool>,
}

#[derive(Serialize)]
pub struct TransferResponse {
    pub item_id: ItemId,
}

pub async fn enqueue_transfer(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
    let item_id = state
        .queue
        .enqueue(req.receiver, &req.amount, req.memo, req.has_storage_deposit)
        .await?;
    Ok(Json(TransferResponse { item_id }))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
) -> Result<Json<Item>, ApiError> {
    let item = state.queue.get_item(id).await?.ok_or(ApiError::ItemNotFound(id))?;
    Ok(Json(item))
}

#[derive(Deserialize)]
pub struct ListItemsQuery {
    pub receiver: Option<String>,
    pub stalled: Option<bool>,
}

pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let items = state.queue.list_items(query.receiver, query.stalled).await?;
    Ok(Json(items))
}

pub async fn unstall_item(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
) -> Result<Json<u64>, ApiError> {
    Ok(Json(state.queue.unstall(id).await?))
}

pub async fn unstall_many(
    State(state): State<AppState>,
    Json(ids): Json<Vec<ItemId>>,
) -> Result<Json<u64>, ApiError> {
    Ok(Json(state.queue.unstall_many(ids).await?))
}

pub async fn unstall_all(State(state): State<AppState>) -> Result<Json<u64>, ApiError> {
    Ok(Json(state.queue.unstall_all().await?))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    Ok(Json(state.queue.stats().await?))
}
