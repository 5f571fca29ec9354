//! HTTP handlers for farmer/dealer connections

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::Connection;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::connection::{
    ConnectionFilter, ConnectionService, RequestConnectionInput, UpdateConnectionStatusInput,
};
use crate::AppState;

/// Request a connection using the other party's code
pub async fn request_connection(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RequestConnectionInput>,
) -> AppResult<Json<Connection>> {
    input.validate()?;
    let service = ConnectionService::new(state.db);
    let connection = service
        .request_connection(&current_user.0, &input.code)
        .await?;
    Ok(Json(connection))
}

pub async fn list_connections(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<ConnectionFilter>,
) -> AppResult<Json<Vec<Connection>>> {
    let service = ConnectionService::new(state.db);
    let connections = service
        .list_connections(&current_user.0, filter.status)
        .await?;
    Ok(Json(connections))
}

/// Approve or reject a connection request
pub async fn update_connection_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(connection_id): Path<Uuid>,
    Json(input): Json<UpdateConnectionStatusInput>,
) -> AppResult<Json<Connection>> {
    let service = ConnectionService::new(state.db);
    let connection = service
        .update_connection_status(connection_id, input.status, &current_user.0)
        .await?;
    Ok(Json(connection))
}
