//! HTTP handlers for the income/expense ledger

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{ChainReport, LedgerEntry, LedgerSummary, PaginatedResponse, Pagination};
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::ledger::{AddEntryInput, LedgerService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: Decimal,
}

/// Add a manual income or expense entry
pub async fn add_ledger_entry(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<AddEntryInput>,
) -> AppResult<Json<LedgerEntry>> {
    input.validate()?;
    let service = LedgerService::new(state.db);
    let entry = service.add_entry(current_user.0.user_id, input).await?;
    Ok(Json(entry))
}

/// List entries newest first
pub async fn list_ledger_entries(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<LedgerQuery>,
) -> AppResult<Json<PaginatedResponse<LedgerEntry>>> {
    let pagination = Pagination::from_query(query.page, query.per_page);
    let service = LedgerService::new(state.db);
    let entries = service
        .list_entries(current_user.0.user_id, &pagination)
        .await?;
    Ok(Json(entries))
}

pub async fn get_ledger_balance(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<BalanceResponse>> {
    let service = LedgerService::new(state.db);
    let balance = service.current_balance(current_user.0.user_id).await?;
    Ok(Json(BalanceResponse { balance }))
}

pub async fn get_ledger_summary(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<LedgerSummary>> {
    let service = LedgerService::new(state.db);
    let summary = service.summary(current_user.0.user_id).await?;
    Ok(Json(summary))
}

/// Re-check the stored running balances
pub async fn verify_ledger(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ChainReport>> {
    let service = LedgerService::new(state.db);
    let report = service.verify_chain(current_user.0.user_id).await?;
    Ok(Json(report))
}

/// Download the ledger as CSV
pub async fn export_ledger(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    let service = LedgerService::new(state.db);
    let csv = service.export_csv(current_user.0.user_id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"ledger.csv\""),
        ],
        csv,
    ))
}
