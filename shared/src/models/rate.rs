//! Market rates published by administrators

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A published market rate for a product in a region
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MarketRate {
    pub id: Uuid,
    /// e.g. "broiler_live", "egg_tray", "layer_culled"
    pub product: String,
    pub region: String,
    pub rate_per_unit: Decimal,
    pub unit: String,
    pub effective_date: NaiveDate,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}
