//! HTTP handlers for market rates

use axum::{
    extract::{Query, State},
    Json,
};
use shared::MarketRate;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::{require_admin, CurrentUser};
use crate::services::rate::{PublishRateInput, RateQuery, RateService};
use crate::AppState;

/// Publish a rate (admin)
pub async fn publish_rate(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<PublishRateInput>,
) -> AppResult<Json<MarketRate>> {
    require_admin(&current_user.0)?;
    input.validate()?;
    let service = RateService::new(state.db);
    let rate = service.publish_rate(current_user.0.user_id, input).await?;
    Ok(Json(rate))
}

/// Latest rate per product and region
pub async fn latest_rates(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<RateQuery>,
) -> AppResult<Json<Vec<MarketRate>>> {
    let service = RateService::new(state.db);
    let rates = service.latest_rates(query.region.as_deref()).await?;
    Ok(Json(rates))
}
