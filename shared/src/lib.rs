//! Shared types and domain logic for the BakeStock inventory backend
//!
//! This crate contains everything that does not touch the database or the
//! HTTP layer: entity and DTO types, brand normalization, pricing rounding
//! rules, FIFO batch allocation planning, and the barcode codec.

pub mod allocation;
pub mod barcode;
pub mod models;
pub mod pricing;
pub mod types;
pub mod validation;

pub use allocation::*;
pub use barcode::*;
pub use models::*;
pub use pricing::*;
pub use types::*;
pub use validation::*;
