//! HTTP handlers for the BakeStock backend

pub mod barcode;
pub mod health;
pub mod inventory;
pub mod purchase;
pub mod sale;

pub use barcode::*;
pub use health::*;
pub use inventory::*;
pub use purchase::*;
pub use sale::*;
