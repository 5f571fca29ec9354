//! Domain models for the PoultryMitra platform

mod connection;
mod diagnosis;
mod inventory;
mod ledger;
mod order;
mod rate;
mod user;

pub use connection::*;
pub use diagnosis::*;
pub use inventory::*;
pub use ledger::*;
pub use order::*;
pub use rate::*;
pub use user::*;
