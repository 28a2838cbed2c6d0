//! Batch ledger operations
//!
//! The ledger is the set of purchase-intake batches (`purchase_items` rows).
//! Everything here runs on a caller-supplied connection so workflows can keep
//! all their reads and writes inside one transaction.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};

use shared::{brand_to_sql, Brand};

use crate::error::{AppError, AppResult};

/// Restricts batch selection when a sale line is pinned to a specific
/// purchase or intake date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatchPin {
    None,
    Purchase(i32),
    Date(NaiveDate),
}

/// A ledger batch as the consumption path sees it.
#[derive(Debug, Clone, FromRow)]
pub struct LedgerBatch {
    pub purchase_item_id: i32,
    pub purchase_id: i32,
    pub remaining_qty: Decimal,
    pub unit_price: Decimal,
    pub selling_price: Option<Decimal>,
    pub purchase_date: NaiveDate,
}

/// Create a batch under an existing purchase. Remaining quantity starts at
/// the full intake quantity.
pub async fn create_batch(
    conn: &mut PgConnection,
    purchase_id: i32,
    product_id: i32,
    brand: &Option<Brand>,
    qty: Decimal,
    unit_price: Decimal,
    selling_price: Option<Decimal>,
    total_price: Decimal,
) -> AppResult<i32> {
    if qty <= Decimal::ZERO {
        return Err(AppError::Validation {
            field: "qty".to_string(),
            message: "Quantity must be positive".to_string(),
        });
    }

    let purchase_item_id = sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO purchase_items (purchase_id, product_id, brand, qty, remaining_qty,
                                    unit_price, selling_price, total_price)
        VALUES ($1, $2, $3, $4, $4, $5, $6, $7)
        RETURNING purchase_item_id
        "#,
    )
    .bind(purchase_id)
    .bind(product_id)
    .bind(brand_to_sql(brand))
    .bind(qty)
    .bind(unit_price)
    .bind(selling_price)
    .bind(total_price)
    .fetch_one(&mut *conn)
    .await?;

    Ok(purchase_item_id)
}

/// Fetch the live batches for an inventory key in FIFO order (intake date
/// ascending, then batch id), locking the rows for the remainder of the
/// transaction so concurrent sales cannot allocate the same units.
pub async fn live_batches_for_update(
    conn: &mut PgConnection,
    product_id: i32,
    vendor_id: i32,
    brand: &Option<Brand>,
    pin: BatchPin,
) -> AppResult<Vec<LedgerBatch>> {
    let base = r#"
        SELECT pi.purchase_item_id, pi.purchase_id, pi.remaining_qty,
               pi.unit_price, pi.selling_price, pr.purchase_date
        FROM purchase_items pi
        JOIN purchases pr ON pr.purchase_id = pi.purchase_id
        WHERE pi.product_id = $1 AND pr.vendor_id = $2
          AND (pi.brand IS NOT DISTINCT FROM $3)
          AND pi.remaining_qty > 0
    "#;
    let order = " ORDER BY pr.purchase_date ASC, pi.purchase_item_id ASC FOR UPDATE OF pi";

    let batches = match pin {
        BatchPin::None => {
            sqlx::query_as::<_, LedgerBatch>(&format!("{}{}", base, order))
                .bind(product_id)
                .bind(vendor_id)
                .bind(brand_to_sql(brand))
                .fetch_all(&mut *conn)
                .await?
        }
        BatchPin::Purchase(purchase_id) => {
            sqlx::query_as::<_, LedgerBatch>(&format!(
                "{} AND pi.purchase_id = $4{}",
                base, order
            ))
            .bind(product_id)
            .bind(vendor_id)
            .bind(brand_to_sql(brand))
            .bind(purchase_id)
            .fetch_all(&mut *conn)
            .await?
        }
        BatchPin::Date(date) => {
            sqlx::query_as::<_, LedgerBatch>(&format!(
                "{} AND pr.purchase_date = $4{}",
                base, order
            ))
            .bind(product_id)
            .bind(vendor_id)
            .bind(brand_to_sql(brand))
            .bind(date)
            .fetch_all(&mut *conn)
            .await?
        }
    };

    Ok(batches)
}

/// Decrement a batch's remaining quantity.
///
/// The quantity guard lives in the WHERE clause, so even without the row lock
/// an over-consuming update affects zero rows instead of driving the batch
/// negative.
pub async fn decrement_remaining(
    conn: &mut PgConnection,
    purchase_item_id: i32,
    amount: Decimal,
) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE purchase_items
        SET remaining_qty = remaining_qty - $1
        WHERE purchase_item_id = $2 AND remaining_qty >= $1
        "#,
    )
    .bind(amount)
    .bind(purchase_item_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::InsufficientBatchQuantity {
            batch_id: purchase_item_id,
        });
    }

    Ok(())
}

/// Sum of remaining quantity over all batches for a key. Source of truth for
/// the inventory aggregate.
pub async fn sum_remaining_for_key(
    conn: &mut PgConnection,
    product_id: i32,
    vendor_id: i32,
    brand: &Option<Brand>,
) -> AppResult<Decimal> {
    let sum = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(pi.remaining_qty), 0)::NUMERIC(12,2)
        FROM purchase_items pi
        JOIN purchases pr ON pr.purchase_id = pi.purchase_id
        WHERE pi.product_id = $1 AND pr.vendor_id = $2
          AND (pi.brand IS NOT DISTINCT FROM $3)
        "#,
    )
    .bind(product_id)
    .bind(vendor_id)
    .bind(brand_to_sql(brand))
    .fetch_one(&mut *conn)
    .await?;

    Ok(sum)
}
