//! Field validators for request DTOs
//!
//! Adapts the `shared::validation` rules to `validator` custom functions.

use rust_decimal::Decimal;
use std::borrow::Cow;
use validator::ValidationError;

fn to_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Ledger amounts: positive with at most two decimal places
pub fn money_amount(amount: &Decimal) -> Result<(), ValidationError> {
    shared::validate_positive_amount(*amount).map_err(|m| to_error("positive", m))?;
    shared::validate_currency_scale(*amount).map_err(|m| to_error("scale", m))
}

/// Quantities ordered or purchased
pub fn positive_quantity(quantity: &Decimal) -> Result<(), ValidationError> {
    if *quantity <= Decimal::ZERO {
        return Err(to_error("positive", "Quantity must be greater than zero"));
    }
    Ok(())
}

/// Rates, stock levels and thresholds
pub fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    shared::validate_non_negative(*value).map_err(|m| to_error("non_negative", m))
}

pub fn rate(value: &Decimal) -> Result<(), ValidationError> {
    non_negative(value)?;
    shared::validate_currency_scale(*value).map_err(|m| to_error("scale", m))
}

pub fn user_code(code: &str) -> Result<(), ValidationError> {
    shared::validate_user_code(code).map_err(|m| to_error("user_code", m))
}

pub fn indian_mobile(phone: &str) -> Result<(), ValidationError> {
    shared::validate_indian_mobile(phone).map_err(|m| to_error("phone", m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_money_amount() {
        assert!(money_amount(&Decimal::from(100)).is_ok());
        assert!(money_amount(&Decimal::ZERO).is_err());
        assert!(money_amount(&Decimal::from_str("1.005").unwrap()).is_err());
    }

    #[test]
    fn test_rate_allows_zero() {
        assert!(rate(&Decimal::ZERO).is_ok());
        assert!(rate(&Decimal::from(-1)).is_err());
    }

    #[test]
    fn test_error_carries_message() {
        let err = positive_quantity(&Decimal::ZERO).unwrap_err();
        assert_eq!(err.message.as_deref(), Some("Quantity must be greater than zero"));
    }
}
