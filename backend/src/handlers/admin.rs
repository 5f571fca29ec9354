//! HTTP handlers for the admin back-office

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{PaginatedResponse, User};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_admin, CurrentUser};
use crate::services::ledger::{LedgerOverviewRow, LedgerService};
use crate::services::user::{UpdatePlanInput, UpdateUserStatusInput, UserFilter, UserService};
use crate::AppState;

pub async fn admin_list_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<UserFilter>,
) -> AppResult<Json<PaginatedResponse<User>>> {
    require_admin(&current_user.0)?;
    let service = UserService::new(state.db);
    let users = service.list_users(&filter).await?;
    Ok(Json(users))
}

/// Approve, suspend or reinstate a user
pub async fn admin_update_user_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateUserStatusInput>,
) -> AppResult<Json<User>> {
    require_admin(&current_user.0)?;
    let service = UserService::new(state.db);
    let user = service
        .update_user_status(&current_user.0, user_id, input.status)
        .await?;
    Ok(Json(user))
}

pub async fn admin_update_plan(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdatePlanInput>,
) -> AppResult<Json<User>> {
    require_admin(&current_user.0)?;
    let service = UserService::new(state.db);
    let user = service
        .update_plan(&current_user.0, user_id, input.plan_type)
        .await?;
    Ok(Json(user))
}

pub async fn admin_delete_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    require_admin(&current_user.0)?;
    let service = UserService::new(state.db);
    service.delete_user(&current_user.0, user_id).await?;
    Ok(Json(()))
}

/// Balances and totals across all ledgers
pub async fn admin_ledger_overview(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<LedgerOverviewRow>>> {
    require_admin(&current_user.0)?;
    let service = LedgerService::new(state.db);
    let rows = service.admin_overview().await?;
    Ok(Json(rows))
}
