//! HTTP handlers for farmer/dealer orders

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::Order;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::order::{CreateOrderInput, OrderFilter, OrderService, UpdateOrderStatusInput};
use crate::AppState;

/// Place an order with a connected counterparty
pub async fn create_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<Json<Order>> {
    input.validate()?;
    let service = OrderService::new(state.db);
    let order = service.create_order(&current_user.0, input).await?;
    Ok(Json(order))
}

pub async fn list_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<OrderFilter>,
) -> AppResult<Json<Vec<Order>>> {
    let service = OrderService::new(state.db);
    let orders = service.list_orders(&current_user.0, filter.status).await?;
    Ok(Json(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db);
    let order = service.get_order(&current_user.0, order_id).await?;
    Ok(Json(order))
}

/// Approve or reject an order
pub async fn update_order_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdateOrderStatusInput>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db);
    let order = service
        .update_order_status(order_id, input.status, &current_user.0)
        .await?;
    Ok(Json(order))
}
