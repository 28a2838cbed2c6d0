//! Entity models shared between the backend and the web dashboard

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::barcode::ParsedBarcode;
use crate::types::{Brand, UnitKind};

/// Product directory entry. CRUD lives outside the core; batches and
/// inventory rows reference it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub product_id: i32,
    pub product_name: String,
    pub unit_kind: UnitKind,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    pub vendor_id: i32,
    pub name: String,
    pub contact_no: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: i32,
    pub name: String,
    pub contact_no: Option<String>,
    pub address: Option<String>,
}

/// Purchase header: one intake event at a vendor, carrying the intake date
/// its batches inherit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub purchase_id: i32,
    pub invoice_no: Option<String>,
    pub vendor_id: i32,
    pub purchase_date: NaiveDate,
    pub bill_price: Decimal,
}

/// A purchase line: the batch entity of the ledger.
///
/// `remaining_qty` starts equal to `qty` and only ever decreases, floored at
/// zero, as sales consume the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub purchase_item_id: i32,
    pub purchase_id: i32,
    pub product_id: i32,
    pub brand: Option<Brand>,
    pub qty: Decimal,
    pub remaining_qty: Decimal,
    pub unit_price: Decimal,
    pub selling_price: Option<Decimal>,
    pub total_price: Decimal,
}

/// The (product, vendor, brand-bucket) identity every aggregate row, pricing
/// lookup, and allocation is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InventoryKey {
    pub product_id: i32,
    pub vendor_id: i32,
    pub brand: Option<Brand>,
}

/// Denormalized quantity-on-hand row; invariant-equal to the sum of
/// remaining quantities over the live batches sharing its key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub inventory_id: i32,
    pub product_id: i32,
    pub vendor_id: i32,
    pub brand: Option<Brand>,
    pub qty: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub sale_id: i32,
    pub sale_invoice_no: Option<String>,
    pub customer_id: Option<i32>,
    pub sale_date: NaiveDate,
    pub total_amount: Decimal,
    pub discount: Option<Decimal>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItem {
    pub sales_item_id: i32,
    pub sale_id: i32,
    pub inventory_id: i32,
    pub qty: Decimal,
    pub brand: Option<Brand>,
    pub unit_price: Decimal,
    pub selling_price: Decimal,
    pub profit: Decimal,
}

/// Stored barcode row. Either purchase-bound (`purchase_id` set) or
/// invoice-bound (`invoice_no`/`brand`/`purchase_date` used to re-resolve a
/// purchase at read time).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarcodeRecord {
    pub barcode_id: i32,
    pub barcode: String,
    pub product_id: i32,
    pub purchase_id: Option<i32>,
    pub invoice_no: Option<String>,
    pub brand: Option<Brand>,
    pub purchase_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Where a barcode's identity came from. Row data wins over parsed data for
/// any field both provide; keeping the two sources distinct keeps the
/// fallback chain auditable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum BarcodeIdentity {
    RowBacked(BarcodeRecord),
    ParsedFromString(ParsedBarcode),
}

/// Terminal result of barcode resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedBarcode {
    pub product_id: i32,
    pub purchase_id: i32,
    pub brand: Option<Brand>,
    pub invoice_no: Option<String>,
}
