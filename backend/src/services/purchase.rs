//! Purchase intake workflow
//!
//! Records one intake event: purchase header, a single ledger batch, and the
//! freshly recomputed inventory aggregate for the batch's key. All three
//! writes commit or roll back together.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use shared::{
    parse_flexible_date, unit_cost_from_bill, validate_quantity, Batch, Brand, InventoryItem,
    Purchase,
};

use crate::error::{AppError, AppResult};
use crate::services::{inventory, ledger};

/// Purchase intake service
#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
}

/// Input for recording a purchase intake
#[derive(Debug, Deserialize)]
pub struct CreatePurchaseInput {
    pub invoice_no: Option<String>,
    pub vendor_id: i32,
    pub product_id: i32,
    pub brand: Option<String>,
    pub qty: Decimal,
    pub bill_price: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub date: Option<String>,
}

/// Everything a completed intake produced.
#[derive(Debug, Serialize)]
pub struct PurchaseCreated {
    pub purchase: Purchase,
    pub item: Batch,
    pub inventory: InventoryItem,
}

/// A purchase header with its lines, for listings.
#[derive(Debug, Serialize)]
pub struct PurchaseWithItems {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub vendor_name: Option<String>,
    pub items: Vec<Batch>,
}

#[derive(Debug, FromRow)]
struct PurchaseHeaderRow {
    purchase_id: i32,
    invoice_no: Option<String>,
    vendor_id: i32,
    purchase_date: NaiveDate,
    bill_price: Decimal,
    vendor_name: Option<String>,
}

#[derive(Debug, FromRow)]
struct BatchRow {
    purchase_item_id: i32,
    purchase_id: i32,
    product_id: i32,
    brand: Option<String>,
    qty: Decimal,
    remaining_qty: Decimal,
    unit_price: Decimal,
    selling_price: Option<Decimal>,
    total_price: Decimal,
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Batch {
            purchase_item_id: row.purchase_item_id,
            purchase_id: row.purchase_id,
            product_id: row.product_id,
            brand: Brand::normalize(row.brand.as_deref()),
            qty: row.qty,
            remaining_qty: row.remaining_qty,
            unit_price: row.unit_price,
            selling_price: row.selling_price,
            total_price: row.total_price,
        }
    }
}

impl PurchaseService {
    /// Create a new PurchaseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a purchase intake.
    ///
    /// Unit cost defaults to `round2(bill_price / qty)`. A selling price is
    /// stored only when the caller quotes one; otherwise the batch keeps NULL
    /// and the price is derived per unit kind at quote/sale time. The
    /// aggregate row for the key is set to the recomputed ledger sum, not
    /// incremented.
    pub async fn create_purchase(&self, input: CreatePurchaseInput) -> AppResult<PurchaseCreated> {
        validate_quantity(input.qty).map_err(|message| AppError::Validation {
            field: "qty".to_string(),
            message,
        })?;

        let bill_price = input.bill_price.ok_or_else(|| AppError::Validation {
            field: "bill_price".to_string(),
            message: "Missing bill_price".to_string(),
        })?;

        let purchase_date = match &input.date {
            Some(raw) => parse_flexible_date(raw).ok_or_else(|| AppError::Validation {
                field: "date".to_string(),
                message: format!("Unparseable date: {}", raw),
            })?,
            None => Utc::now().date_naive(),
        };

        let brand = Brand::normalize(input.brand.as_deref());
        let unit_price = input
            .unit_price
            .unwrap_or_else(|| unit_cost_from_bill(bill_price, input.qty));

        let mut tx = self.db.begin().await?;

        let purchase_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO purchases (invoice_no, vendor_id, purchase_date, bill_price)
            VALUES ($1, $2, $3, $4)
            RETURNING purchase_id
            "#,
        )
        .bind(&input.invoice_no)
        .bind(input.vendor_id)
        .bind(purchase_date)
        .bind(bill_price)
        .fetch_one(&mut *tx)
        .await?;

        let purchase_item_id = ledger::create_batch(
            &mut *tx,
            purchase_id,
            input.product_id,
            &brand,
            input.qty,
            unit_price,
            input.selling_price,
            bill_price,
        )
        .await?;

        let inventory_item =
            inventory::recompute_key(&mut *tx, input.product_id, input.vendor_id, &brand).await?;

        let item = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT purchase_item_id, purchase_id, product_id, brand, qty, remaining_qty,
                   unit_price, selling_price, total_price
            FROM purchase_items
            WHERE purchase_item_id = $1
            "#,
        )
        .bind(purchase_item_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            purchase_id,
            product_id = input.product_id,
            vendor_id = input.vendor_id,
            qty = %input.qty,
            "purchase intake recorded"
        );

        Ok(PurchaseCreated {
            purchase: Purchase {
                purchase_id,
                invoice_no: input.invoice_no,
                vendor_id: input.vendor_id,
                purchase_date,
                bill_price,
            },
            item: item.into(),
            inventory: inventory_item,
        })
    }

    /// List purchases newest-first with their lines.
    pub async fn list_purchases(&self) -> AppResult<Vec<PurchaseWithItems>> {
        let headers = sqlx::query_as::<_, PurchaseHeaderRow>(
            r#"
            SELECT p.purchase_id, p.invoice_no, p.vendor_id, p.purchase_date, p.bill_price,
                   v.name AS vendor_name
            FROM purchases p
            LEFT JOIN vendors v ON v.vendor_id = p.vendor_id
            ORDER BY p.purchase_id DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let items = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT purchase_item_id, purchase_id, product_id, brand, qty, remaining_qty,
                   unit_price, selling_price, total_price
            FROM purchase_items
            ORDER BY purchase_item_id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut by_purchase: std::collections::HashMap<i32, Vec<Batch>> =
            std::collections::HashMap::new();
        for item in items {
            by_purchase
                .entry(item.purchase_id)
                .or_default()
                .push(item.into());
        }

        Ok(headers
            .into_iter()
            .map(|h| PurchaseWithItems {
                purchase: Purchase {
                    purchase_id: h.purchase_id,
                    invoice_no: h.invoice_no,
                    vendor_id: h.vendor_id,
                    purchase_date: h.purchase_date,
                    bill_price: h.bill_price,
                },
                vendor_name: h.vendor_name,
                items: by_purchase.remove(&h.purchase_id).unwrap_or_default(),
            })
            .collect())
    }
}
