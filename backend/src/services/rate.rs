//! Market rate service: admin-published prices

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::MarketRate;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;

/// Market rate service
#[derive(Clone)]
pub struct RateService {
    db: PgPool,
}

/// Input for publishing a rate
#[derive(Debug, Deserialize, Validate)]
pub struct PublishRateInput {
    #[validate(length(min = 1, max = 60))]
    pub product: String,
    #[validate(length(min = 1, max = 60))]
    pub region: String,
    #[validate(custom = "crate::validators::rate")]
    pub rate_per_unit: Decimal,
    #[validate(length(min = 1, max = 20))]
    pub unit: String,
    /// Defaults to today
    pub effective_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct RateQuery {
    pub region: Option<String>,
}

impl RateService {
    /// Create a new RateService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn publish_rate(&self, admin_id: Uuid, input: PublishRateInput) -> AppResult<MarketRate> {
        let effective_date = input.effective_date.unwrap_or_else(|| Utc::now().date_naive());

        let rate = sqlx::query_as::<_, MarketRate>(
            r#"
            INSERT INTO market_rates (product, region, rate_per_unit, unit, effective_date, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, product, region, rate_per_unit, unit, effective_date, created_by, created_at
            "#,
        )
        .bind(input.product.trim().to_lowercase())
        .bind(input.region.trim())
        .bind(input.rate_per_unit)
        .bind(input.unit.trim())
        .bind(effective_date)
        .bind(admin_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            product = %rate.product,
            region = %rate.region,
            rate = %rate.rate_per_unit,
            "Market rate published"
        );

        Ok(rate)
    }

    /// Most recent rate per product and region, optionally for one region
    pub async fn latest_rates(&self, region: Option<&str>) -> AppResult<Vec<MarketRate>> {
        let rates = sqlx::query_as::<_, MarketRate>(
            r#"
            SELECT DISTINCT ON (product, region)
                   id, product, region, rate_per_unit, unit, effective_date, created_by, created_at
            FROM market_rates
            WHERE ($1::text IS NULL OR region ILIKE $1)
              AND effective_date <= CURRENT_DATE
            ORDER BY product, region, effective_date DESC, created_at DESC
            "#,
        )
        .bind(region)
        .fetch_all(&self.db)
        .await?;

        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_rate_validation() {
        let input = PublishRateInput {
            product: "broiler_live".to_string(),
            region: "Namakkal".to_string(),
            rate_per_unit: Decimal::from(98),
            unit: "kg".to_string(),
            effective_date: None,
        };
        assert!(input.validate().is_ok());

        let input = PublishRateInput {
            rate_per_unit: Decimal::from(-2),
            ..input
        };
        assert!(input.validate().is_err());
    }
}
