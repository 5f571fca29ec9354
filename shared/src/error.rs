//! Domain rule violations

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by the pure domain rules in this crate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Insufficient stock: available {available}, requested {requested}")]
    InsufficientStock {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Amount must be greater than zero")]
    NonPositiveAmount,

    #[error("Quantity cannot be negative")]
    NegativeQuantity,

    #[error("Balance chain broken at entry {index}: expected {expected}, found {found}")]
    BrokenChain {
        index: usize,
        expected: Decimal,
        found: Decimal,
    },
}
