//! Inventory aggregate service
//!
//! Maintains the denormalized (product, vendor, brand) -> quantity-on-hand
//! view. Workflows never increment the aggregate; they recompute it from the
//! batch ledger so drift from any earlier partial failure heals on the next
//! write. `rebuild_all` is the administrative variant covering every key.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};

use shared::{brand_to_sql, Brand, InventoryItem};

use crate::error::{AppError, AppResult};
use crate::services::ledger;

/// Inventory service for aggregate reads and recovery
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// One row of the stock listing: live batches joined with directory names.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockRow {
    pub purchase_item_id: i32,
    pub inventory_id: Option<i32>,
    pub product_id: i32,
    pub product_name: String,
    pub unit_kind: String,
    pub vendor_id: i32,
    pub vendor_name: String,
    pub brand: Option<String>,
    pub qty: Decimal,
    pub purchase_date: NaiveDate,
}

#[derive(Debug, FromRow)]
struct InventoryRow {
    inventory_id: i32,
    product_id: i32,
    vendor_id: i32,
    brand: Option<String>,
    qty: Decimal,
}

impl From<InventoryRow> for InventoryItem {
    fn from(row: InventoryRow) -> Self {
        InventoryItem {
            inventory_id: row.inventory_id,
            product_id: row.product_id,
            vendor_id: row.vendor_id,
            brand: Brand::normalize(row.brand.as_deref()),
            qty: row.qty,
        }
    }
}

/// Recompute one aggregate key from the ledger and upsert the row.
///
/// Always writes the freshly computed sum rather than applying a delta.
pub async fn recompute_key(
    conn: &mut PgConnection,
    product_id: i32,
    vendor_id: i32,
    brand: &Option<Brand>,
) -> AppResult<InventoryItem> {
    let qty = ledger::sum_remaining_for_key(conn, product_id, vendor_id, brand).await?;

    let row = sqlx::query_as::<_, InventoryRow>(
        r#"
        INSERT INTO inventory_items (product_id, vendor_id, brand, qty)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (product_id, vendor_id, COALESCE(brand, ''))
        DO UPDATE SET qty = EXCLUDED.qty
        RETURNING inventory_id, product_id, vendor_id, brand, qty
        "#,
    )
    .bind(product_id)
    .bind(vendor_id)
    .bind(brand_to_sql(brand))
    .bind(qty)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

/// Fetch an aggregate row by id, resolving the key a sale line refers to.
pub async fn get_by_id(conn: &mut PgConnection, inventory_id: i32) -> AppResult<InventoryItem> {
    let row = sqlx::query_as::<_, InventoryRow>(
        "SELECT inventory_id, product_id, vendor_id, brand, qty FROM inventory_items WHERE inventory_id = $1",
    )
    .bind(inventory_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::InvalidReference(format!("inventory item {}", inventory_id)))?;

    Ok(row.into())
}

/// Fetch an aggregate row by its key.
pub async fn get_by_key(
    conn: &mut PgConnection,
    product_id: i32,
    vendor_id: i32,
    brand: &Option<Brand>,
) -> AppResult<Option<InventoryItem>> {
    let row = sqlx::query_as::<_, InventoryRow>(
        r#"
        SELECT inventory_id, product_id, vendor_id, brand, qty
        FROM inventory_items
        WHERE product_id = $1 AND vendor_id = $2 AND (brand IS NOT DISTINCT FROM $3)
        "#,
    )
    .bind(product_id)
    .bind(vendor_id)
    .bind(brand_to_sql(brand))
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

#[derive(Debug, FromRow)]
struct KeySumRow {
    product_id: i32,
    vendor_id: i32,
    brand: Option<String>,
    qty: Decimal,
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List live stock: batches with remaining quantity, joined with their
    /// aggregate row and directory names, newest intake first.
    pub async fn list_stock(&self) -> AppResult<Vec<StockRow>> {
        let rows = sqlx::query_as::<_, StockRow>(
            r#"
            SELECT pi.purchase_item_id,
                   i.inventory_id,
                   pi.product_id,
                   p.product_name,
                   p.unit_kind::TEXT AS unit_kind,
                   pr.vendor_id,
                   v.name AS vendor_name,
                   pi.brand,
                   pi.remaining_qty AS qty,
                   pr.purchase_date
            FROM purchase_items pi
            JOIN purchases pr ON pr.purchase_id = pi.purchase_id
            JOIN products p ON p.product_id = pi.product_id
            JOIN vendors v ON v.vendor_id = pr.vendor_id
            LEFT JOIN inventory_items i
              ON i.product_id = pi.product_id
             AND i.vendor_id = pr.vendor_id
             AND (i.brand IS NOT DISTINCT FROM pi.brand)
            WHERE pi.remaining_qty > 0
            ORDER BY pr.purchase_date DESC, pi.purchase_item_id DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Rebuild every aggregate row from the ledger.
    ///
    /// Sums remaining quantity, not original quantity; summing original
    /// quantity would resurrect already-sold stock. Returns the number of
    /// keys touched. Idempotent.
    pub async fn rebuild_all(&self) -> AppResult<u64> {
        let mut tx = self.db.begin().await?;

        let keys = sqlx::query_as::<_, KeySumRow>(
            r#"
            SELECT pi.product_id, pr.vendor_id, pi.brand,
                   COALESCE(SUM(pi.remaining_qty), 0)::NUMERIC(12,2) AS qty
            FROM purchase_items pi
            JOIN purchases pr ON pr.purchase_id = pi.purchase_id
            GROUP BY pi.product_id, pr.vendor_id, pi.brand
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        let touched = keys.len() as u64;
        for key in keys {
            sqlx::query(
                r#"
                INSERT INTO inventory_items (product_id, vendor_id, brand, qty)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (product_id, vendor_id, COALESCE(brand, ''))
                DO UPDATE SET qty = EXCLUDED.qty
                "#,
            )
            .bind(key.product_id)
            .bind(key.vendor_id)
            .bind(key.brand.as_deref())
            .bind(key.qty)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(keys = touched, "inventory aggregate rebuilt from ledger");
        Ok(touched)
    }
}
