//! Validation utilities for the PoultryMitra platform
//!
//! Includes India-specific checks used during signup.

use rust_decimal::Decimal;

// ============================================================================
// Money and quantity
// ============================================================================

/// Amounts on ledger entries and purchases must be strictly positive
pub fn validate_positive_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than zero");
    }
    Ok(())
}

/// Rates and thresholds may be zero but never negative
pub fn validate_non_negative(value: Decimal) -> Result<(), &'static str> {
    if value < Decimal::ZERO {
        return Err("Value cannot be negative");
    }
    Ok(())
}

/// Ledger amounts carry at most two decimal places (paise)
pub fn validate_currency_scale(amount: Decimal) -> Result<(), &'static str> {
    if amount.normalize().scale() > 2 {
        return Err("Amount can have at most two decimal places");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate a shareable user code: "PM-" followed by 6 uppercase hex characters
pub fn validate_user_code(code: &str) -> Result<(), &'static str> {
    let Some(rest) = code.strip_prefix("PM-") else {
        return Err("User code must start with 'PM-'");
    };
    if rest.len() != 6 {
        return Err("User code must have 6 characters after 'PM-'");
    }
    if !rest
        .chars()
        .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
    {
        return Err("User code must be uppercase hexadecimal");
    }
    Ok(())
}

// ============================================================================
// India-Specific Validations
// ============================================================================

/// Validate Indian mobile number format
/// Accepts: 9876543210, 98765-43210, +91 9876543210, 09876543210
pub fn validate_indian_mobile(phone: &str) -> Result<(), &'static str> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    let local = match digits.len() {
        10 => digits.as_str(),
        11 if digits.starts_with('0') => &digits[1..],
        12 if digits.starts_with("91") => &digits[2..],
        _ => return Err("Invalid Indian mobile number format"),
    };

    match local.chars().next() {
        Some('6'..='9') => Ok(()),
        _ => Err("Indian mobile numbers start with 6, 7, 8 or 9"),
    }
}
