//! HTTP handlers for user profiles and invitations

use axum::{
    extract::{Path, State},
    Json,
};
use shared::User;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::user::{CreateInvitationInput, CreateProfileInput, Invitation, UserService};
use crate::AppState;

/// Create the caller's profile after signing up with the auth provider
pub async fn create_profile(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProfileInput>,
) -> AppResult<Json<User>> {
    input.validate()?;
    let service = UserService::new(state.db);
    let user = service
        .create_profile(&current_user.0, input, &state.config.admin)
        .await?;
    Ok(Json(user))
}

pub async fn get_my_profile(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db);
    let user = service.get_profile(current_user.0.user_id).await?;
    Ok(Json(user))
}

/// Dealer invites a farmer
pub async fn create_invitation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateInvitationInput>,
) -> AppResult<Json<Invitation>> {
    input.validate()?;
    let service = UserService::new(state.db);
    let invitation = service.create_invitation(&current_user.0, input).await?;
    Ok(Json(invitation))
}

/// Look up a farmer or dealer by their shareable code before connecting
pub async fn lookup_user_by_code(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(code): Path<String>,
) -> AppResult<Json<User>> {
    let code = code.trim().to_uppercase();
    shared::validate_user_code(&code).map_err(|m| AppError::Validation {
        field: "code".to_string(),
        message: m.to_string(),
    })?;
    let service = UserService::new(state.db);
    let user = service.find_by_code(&code).await?;
    Ok(Json(user))
}
