//! Business logic services for the PoultryMitra platform

pub mod connection;
pub mod diagnosis;
pub mod inventory;
pub mod ledger;
pub mod order;
pub mod rate;
pub mod user;

pub use connection::ConnectionService;
pub use diagnosis::DiagnosisService;
pub use inventory::InventoryService;
pub use ledger::LedgerService;
pub use order::OrderService;
pub use rate::RateService;
pub use user::UserService;

use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Serialize rows as CSV with a header line
pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in data {
        wtr.serialize(record)
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
}

/// Map a unique-constraint violation to a 409, everything else to a database error
pub(crate) fn conflict_on_unique(resource: &str, message: &str) -> impl FnOnce(sqlx::Error) -> AppError {
    let resource = resource.to_string();
    let message = message.to_string();
    move |e| match e.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => AppError::Conflict { resource, message },
        _ => AppError::DatabaseError(e),
    }
}
