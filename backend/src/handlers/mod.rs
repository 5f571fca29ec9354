//! HTTP handlers

pub mod admin;
pub mod connections;
pub mod diagnosis;
pub mod health;
pub mod inventory;
pub mod ledger;
pub mod orders;
pub mod rates;
pub mod users;

pub use admin::*;
pub use connections::*;
pub use diagnosis::*;
pub use health::*;
pub use inventory::*;
pub use ledger::*;
pub use orders::*;
pub use rates::*;
pub use users::*;
