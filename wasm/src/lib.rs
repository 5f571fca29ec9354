//! WebAssembly module for PoultryMitra
//!
//! Provides client-side computation for:
//! - Broiler and feed calculators
//! - Ledger balance previews
//! - Offline symptom checks
//! - Form validation

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::calculators::*;
pub use shared::models::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&JsValue::from_str("PoultryMitra calculators loaded"));
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Feed conversion ratio
#[wasm_bindgen]
pub fn calculate_fcr(feed_consumed_kg: f64, birds_alive: u32, avg_weight_kg: f64) -> f64 {
    to_f64(feed_conversion_ratio(
        to_decimal(feed_consumed_kg),
        birds_alive,
        to_decimal(avg_weight_kg),
    ))
}

/// Mortality as a percentage of birds placed
#[wasm_bindgen]
pub fn calculate_mortality(birds_placed: u32, birds_dead: u32) -> f64 {
    to_f64(mortality_percent(birds_placed, birds_dead))
}

/// Daily feed requirement of a flock in kg
#[wasm_bindgen]
pub fn calculate_daily_feed(birds: u32, age_days: u32) -> f64 {
    to_f64(daily_feed_requirement_kg(birds, age_days))
}

/// Estimated profit for a batch
#[wasm_bindgen]
pub fn calculate_batch_profit(
    birds_sold: u32,
    avg_weight_kg: f64,
    sale_rate_per_kg: f64,
    total_costs: f64,
) -> f64 {
    to_f64(batch_profit(
        birds_sold,
        to_decimal(avg_weight_kg),
        to_decimal(sale_rate_per_kg),
        to_decimal(total_costs),
    ))
}

/// Preview the balance after adding an entry ("credit" or "debit")
#[wasm_bindgen]
pub fn preview_balance(previous: f64, amount: f64, entry_type: &str) -> Result<f64, JsValue> {
    let entry_type = match entry_type {
        "credit" => EntryType::Credit,
        "debit" => EntryType::Debit,
        other => return Err(JsValue::from_str(&format!("Unknown entry type: {}", other))),
    };
    next_balance(to_decimal(previous), to_decimal(amount), entry_type)
        .map(to_f64)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Low stock: quantity at or below the threshold
#[wasm_bindgen]
pub fn check_low_stock(stock_quantity: f64, threshold: f64) -> bool {
    is_low_stock(to_decimal(stock_quantity), to_decimal(threshold))
}

/// Rule-based diagnosis for offline use; returns the report as JSON
#[wasm_bindgen]
pub fn diagnose_offline(symptoms: js_sys::Array, flock_age_days: Option<i32>) -> Result<String, JsValue> {
    let symptoms: Vec<String> = symptoms.iter().filter_map(|v| v.as_string()).collect();
    let report = local_diagnosis(&symptoms, flock_age_days);
    serde_json::to_string(&report).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Check a shareable user code before sending a connection request
#[wasm_bindgen]
pub fn is_valid_user_code(code: &str) -> bool {
    validate_user_code(code).is_ok()
}

#[wasm_bindgen]
pub fn is_valid_mobile(phone: &str) -> bool {
    validate_indian_mobile(phone).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fcr() {
        assert!((calculate_fcr(3630.0, 1000, 2.2) - 1.65).abs() < 1e-9);
        assert_eq!(calculate_fcr(100.0, 0, 2.0), 0.0);
    }

    #[test]
    fn test_mortality() {
        assert!((calculate_mortality(1000, 35) - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_daily_feed() {
        assert!((calculate_daily_feed(2000, 21) - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_batch_profit() {
        assert!((calculate_batch_profit(950, 2.0, 110.0, 180000.0) - 29000.0).abs() < 1e-6);
    }

    #[test]
    fn test_low_stock() {
        assert!(check_low_stock(5.0, 5.0));
        assert!(!check_low_stock(6.0, 5.0));
    }

    #[test]
    fn test_validators() {
        assert!(is_valid_user_code("PM-3F9A1C"));
        assert!(!is_valid_user_code("pm-3f9a1c"));
        assert!(is_valid_mobile("9876543210"));
        assert!(!is_valid_mobile("12345"));
    }
}
