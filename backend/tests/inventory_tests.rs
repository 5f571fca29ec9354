//! Inventory tests
//!
//! Stock levels, low-stock alerts and purchase costing for farmer and dealer
//! inventories.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    apply_stock_delta, is_low_stock, purchase_cost, DomainError, InventoryItem, InventorySide,
    ItemCategory, ItemUnit,
};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn item(stock: &str, threshold: &str, rate: &str) -> InventoryItem {
    InventoryItem {
        id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        side: InventorySide::Dealer,
        product_name: "Broiler Finisher Feed".to_string(),
        category: ItemCategory::Feed,
        unit: ItemUnit::Bag,
        stock_quantity: dec(stock),
        rate_per_unit: dec(rate),
        purchase_rate_per_unit: Some(dec("1300")),
        low_stock_threshold: dec(threshold),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_low_stock_at_threshold() {
        assert!(item("10", "10", "1450").is_low_stock());
        assert!(item("0", "10", "1450").is_low_stock());
        assert!(!item("10.5", "10", "1450").is_low_stock());
    }

    #[test]
    fn test_stock_value() {
        assert_eq!(item("12", "5", "1450").stock_value(), dec("17400"));
    }

    #[test]
    fn test_purchase_then_sale() {
        let stock = apply_stock_delta(dec("20"), dec("30")).unwrap();
        assert_eq!(stock, dec("50"));
        let stock = apply_stock_delta(stock, dec("-50")).unwrap();
        assert_eq!(stock, Decimal::ZERO);
    }

    #[test]
    fn test_overdraw_refused() {
        let result = apply_stock_delta(dec("8"), dec("-10"));
        assert_eq!(
            result,
            Err(DomainError::InsufficientStock {
                available: dec("8"),
                requested: dec("10"),
            })
        );
    }

    #[test]
    fn test_purchase_cost() {
        assert_eq!(purchase_cost(dec("25"), dec("42.50")), dec("1062.50"));
        assert_eq!(purchase_cost(dec("0.333"), dec("3")).round_dp(2), dec("1.00"));
    }

    #[test]
    fn test_item_serializes_snake_case() {
        let json = serde_json::to_value(item("5", "2", "100")).unwrap();
        assert_eq!(json["side"], "dealer");
        assert_eq!(json["category"], "feed");
        assert_eq!(json["unit"], "bag");
        // decimals travel as strings
        assert_eq!(json["stock_quantity"], "5");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for quantities from 0.1 to 1000.0
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 1))
    }

    fn delta_strategy() -> impl Strategy<Value = Decimal> {
        (-10000i64..=10000i64).prop_map(|n| Decimal::new(n, 1))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Stock never drops below zero whatever sequence of changes is tried
        #[test]
        fn prop_stock_never_negative(
            initial in quantity_strategy(),
            deltas in prop::collection::vec(delta_strategy(), 1..30)
        ) {
            let mut stock = initial;
            for delta in deltas {
                match apply_stock_delta(stock, delta) {
                    Ok(next) => {
                        prop_assert_eq!(next, stock + delta);
                        stock = next;
                    }
                    Err(DomainError::InsufficientStock { available, .. }) => {
                        prop_assert_eq!(available, stock);
                        prop_assert!(stock + delta < Decimal::ZERO);
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {}", other),
                }
                prop_assert!(stock >= Decimal::ZERO);
            }
        }

        /// Balance = purchases - sales when every sale is covered
        #[test]
        fn prop_balance_accuracy(
            purchases in prop::collection::vec(quantity_strategy(), 1..10),
            sale_fraction in 0u32..=100u32
        ) {
            let mut stock = Decimal::ZERO;
            for q in &purchases {
                stock = apply_stock_delta(stock, *q).unwrap();
            }
            let bought: Decimal = purchases.iter().sum();
            let sold = (bought * Decimal::from(sale_fraction) / Decimal::from(100)).round_dp(1).min(bought);

            let remaining = apply_stock_delta(stock, -sold).unwrap();
            prop_assert_eq!(remaining, bought - sold);
        }

        /// Low stock flag flips exactly at the threshold
        #[test]
        fn prop_low_stock_threshold(stock in quantity_strategy(), threshold in quantity_strategy()) {
            prop_assert_eq!(is_low_stock(stock, threshold), stock <= threshold);
        }
    }
}
