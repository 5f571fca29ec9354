//! Shared types and models for the PoultryMitra platform
//!
//! This crate contains the domain types and the pure business rules shared
//! between the backend, the browser client (via WASM), and the tests.

pub mod calculators;
pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
