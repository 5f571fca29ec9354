//! HTTP handlers for inventory management endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::{InventoryItem, ItemCategory};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::inventory::{
    side_for, AddItemInput, CatalogItem, InventoryService, PurchaseReceipt, RecordPurchaseInput,
    UpdateItemInput,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ItemQuery {
    pub category: Option<ItemCategory>,
}

/// Create an inventory item
pub async fn add_inventory_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<AddItemInput>,
) -> AppResult<Json<InventoryItem>> {
    input.validate()?;
    let side = side_for(current_user.0.role)?;
    let service = InventoryService::new(state.db);
    let item = service
        .add_item(current_user.0.user_id, side, input)
        .await?;
    Ok(Json(item))
}

/// Record a stock purchase and its expense
pub async fn record_purchase(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordPurchaseInput>,
) -> AppResult<Json<PurchaseReceipt>> {
    input.validate()?;
    let side = side_for(current_user.0.role)?;
    let service = InventoryService::new(state.db);
    let receipt = service
        .record_purchase(current_user.0.user_id, side, input)
        .await?;
    Ok(Json(receipt))
}

pub async fn list_inventory_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let service = InventoryService::new(state.db);
    let items = service
        .list_items(current_user.0.user_id, query.category)
        .await?;
    Ok(Json(items))
}

pub async fn get_inventory_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<InventoryItem>> {
    let service = InventoryService::new(state.db);
    let item = service.get_item(current_user.0.user_id, item_id).await?;
    Ok(Json(item))
}

/// Overwrite quantity, rates or threshold
pub async fn update_inventory_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<UpdateItemInput>,
) -> AppResult<Json<InventoryItem>> {
    input.validate()?;
    let service = InventoryService::new(state.db);
    let item = service
        .update_item(current_user.0.user_id, item_id, input)
        .await?;
    Ok(Json(item))
}

pub async fn delete_inventory_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = InventoryService::new(state.db);
    service
        .delete_item(current_user.0.user_id, item_id)
        .await?;
    Ok(Json(()))
}

/// Items at or below their low-stock threshold
pub async fn list_low_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let service = InventoryService::new(state.db);
    let items = service.list_low_stock(current_user.0.user_id).await?;
    Ok(Json(items))
}

/// A dealer's catalog, for connected farmers
pub async fn get_dealer_catalog(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(dealer_id): Path<Uuid>,
) -> AppResult<Json<Vec<CatalogItem>>> {
    let service = InventoryService::new(state.db);
    let items = service
        .list_dealer_catalog(&current_user.0, dealer_id)
        .await?;
    Ok(Json(items))
}
