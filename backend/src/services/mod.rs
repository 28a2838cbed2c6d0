//! Business logic services for the BakeStock backend

pub mod barcode;
pub mod inventory;
pub mod ledger;
pub mod pricing;
pub mod purchase;
pub mod sale;

pub use barcode::BarcodeService;
pub use inventory::InventoryService;
pub use pricing::PricingService;
pub use purchase::PurchaseService;
pub use sale::SaleService;
