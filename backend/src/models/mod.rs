//! Database models for the BakeStock backend
//!
//! Re-exports models from the shared crate; query-shaped row structs live
//! next to the services that run the queries.

pub use shared::models::*;
