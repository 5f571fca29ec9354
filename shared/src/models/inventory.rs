//! Farmer and dealer stock records

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// A stock record owned by one farmer or dealer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct InventoryItem {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub side: InventorySide,
    pub product_name: String,
    pub category: ItemCategory,
    pub unit: ItemUnit,
    pub stock_quantity: Decimal,
    /// Selling rate (dealer) or last purchase rate (farmer)
    pub rate_per_unit: Decimal,
    /// Cost price, dealers only
    pub purchase_rate_per_unit: Option<Decimal>,
    pub low_stock_threshold: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        is_low_stock(self.stock_quantity, self.low_stock_threshold)
    }

    pub fn stock_value(&self) -> Decimal {
        self.stock_quantity * self.rate_per_unit
    }
}

/// Whose inventory an item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "inventory_side", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum InventorySide {
    Farmer,
    Dealer,
}

/// Product categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "item_category", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Feed,
    Medicine,
    Vaccine,
    Chicks,
    Equipment,
    Supplement,
    Other,
}

impl std::fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemCategory::Feed => write!(f, "Feed"),
            ItemCategory::Medicine => write!(f, "Medicine"),
            ItemCategory::Vaccine => write!(f, "Vaccine"),
            ItemCategory::Chicks => write!(f, "Chicks"),
            ItemCategory::Equipment => write!(f, "Equipment"),
            ItemCategory::Supplement => write!(f, "Supplement"),
            ItemCategory::Other => write!(f, "Other"),
        }
    }
}

/// Units of measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "item_unit", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ItemUnit {
    Kg,
    Bag,
    Litre,
    Bottle,
    Dose,
    Piece,
}

/// Low stock: quantity at or below the alert threshold
pub fn is_low_stock(stock_quantity: Decimal, threshold: Decimal) -> bool {
    stock_quantity <= threshold
}

/// Apply a signed change to a stock level, refusing to go below zero
pub fn apply_stock_delta(current: Decimal, delta: Decimal) -> Result<Decimal, DomainError> {
    let next = current + delta;
    if next < Decimal::ZERO {
        return Err(DomainError::InsufficientStock {
            available: current,
            requested: -delta,
        });
    }
    Ok(next)
}

/// Cost of a purchase line
pub fn purchase_cost(quantity: Decimal, rate_per_unit: Decimal) -> Decimal {
    quantity * rate_per_unit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_stock_boundary() {
        assert!(is_low_stock(Decimal::from(5), Decimal::from(5)));
        assert!(is_low_stock(Decimal::from(4), Decimal::from(5)));
        assert!(!is_low_stock(Decimal::from(6), Decimal::from(5)));
    }

    #[test]
    fn test_apply_stock_delta() {
        assert_eq!(
            apply_stock_delta(Decimal::from(50), Decimal::from(-10)),
            Ok(Decimal::from(40))
        );
        assert_eq!(
            apply_stock_delta(Decimal::from(50), Decimal::from(-50)),
            Ok(Decimal::ZERO)
        );
        assert_eq!(
            apply_stock_delta(Decimal::from(5), Decimal::from(20)),
            Ok(Decimal::from(25))
        );
    }

    #[test]
    fn test_apply_stock_delta_rejects_negative() {
        assert_eq!(
            apply_stock_delta(Decimal::from(8), Decimal::from(-10)),
            Err(DomainError::InsufficientStock {
                available: Decimal::from(8),
                requested: Decimal::from(10),
            })
        );
    }

    #[test]
    fn test_purchase_cost() {
        assert_eq!(
            purchase_cost(Decimal::from(20), Decimal::new(145050, 2)),
            Decimal::from(29010)
        );
    }
}
