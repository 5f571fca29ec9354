//! Broiler and feed calculators
//!
//! All functions return zero when a denominator is zero instead of failing,
//! which is what the farm-side calculators display for incomplete input.

use rust_decimal::Decimal;

/// Standard broiler daily feed intake in grams per bird, by week of age (1-based)
const DAILY_FEED_GRAMS_BY_WEEK: [i64; 7] = [25, 55, 90, 125, 155, 180, 200];

/// Feed conversion ratio: feed consumed per kg of live weight
///
/// Formula: feed_consumed_kg / (birds_alive × avg_weight_kg)
pub fn feed_conversion_ratio(
    feed_consumed_kg: Decimal,
    birds_alive: u32,
    avg_weight_kg: Decimal,
) -> Decimal {
    let live_weight = Decimal::from(birds_alive) * avg_weight_kg;
    if live_weight.is_zero() {
        return Decimal::ZERO;
    }
    (feed_consumed_kg / live_weight).round_dp(3)
}

/// Mortality percentage: dead / placed × 100
pub fn mortality_percent(birds_placed: u32, birds_dead: u32) -> Decimal {
    if birds_placed == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(birds_dead) / Decimal::from(birds_placed) * Decimal::from(100)).round_dp(2)
}

/// Daily feed intake in grams for one bird of the given age
pub fn daily_feed_grams_per_bird(age_days: u32) -> i64 {
    let week = (age_days / 7) as usize;
    DAILY_FEED_GRAMS_BY_WEEK[week.min(DAILY_FEED_GRAMS_BY_WEEK.len() - 1)]
}

/// Daily feed requirement of a flock, in kg
pub fn daily_feed_requirement_kg(birds: u32, age_days: u32) -> Decimal {
    Decimal::from(birds) * Decimal::from(daily_feed_grams_per_bird(age_days)) / Decimal::from(1000)
}

/// Estimated batch profit: revenue from birds sold minus total costs
pub fn batch_profit(
    birds_sold: u32,
    avg_weight_kg: Decimal,
    sale_rate_per_kg: Decimal,
    total_costs: Decimal,
) -> Decimal {
    Decimal::from(birds_sold) * avg_weight_kg * sale_rate_per_kg - total_costs
}

/// Production cost per kg of live weight
pub fn cost_per_kg(total_costs: Decimal, birds_sold: u32, avg_weight_kg: Decimal) -> Decimal {
    let live_weight = Decimal::from(birds_sold) * avg_weight_kg;
    if live_weight.is_zero() {
        return Decimal::ZERO;
    }
    (total_costs / live_weight).round_dp(2)
}
