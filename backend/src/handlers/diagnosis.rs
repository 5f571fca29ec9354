//! HTTP handlers for flock health diagnosis and chat

use axum::{extract::State, Json};
use shared::DiagnosisRecord;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::diagnosis::{ChatAnswer, ChatInput, DiagnoseInput, DiagnosisService};
use crate::AppState;

fn diagnosis_service(state: AppState) -> DiagnosisService {
    DiagnosisService::new(state.db, state.ai, state.config.ai.fallback_enabled)
}

pub async fn diagnose(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<DiagnoseInput>,
) -> AppResult<Json<DiagnosisRecord>> {
    input.validate()?;
    let record = diagnosis_service(state)
        .diagnose(current_user.0.user_id, input)
        .await?;
    Ok(Json(record))
}

pub async fn diagnosis_history(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<DiagnosisRecord>>> {
    let records = diagnosis_service(state)
        .list_history(current_user.0.user_id)
        .await?;
    Ok(Json(records))
}

pub async fn chat(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ChatInput>,
) -> AppResult<Json<ChatAnswer>> {
    input.validate()?;
    let answer = diagnosis_service(state)
        .chat(current_user.0.user_id, input)
        .await?;
    Ok(Json(answer))
}
