//! Sale consumption workflow
//!
//! Resolves each requested line to an inventory key (directly or through a
//! barcode), prices it, allocates the quantity across ledger batches
//! oldest-first, and recomputes the touched aggregates. The header and every
//! line commit in one transaction; any failure rolls the whole sale back.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, Transaction};

use shared::{
    line_profit, line_total, parse_flexible_date, plan_fifo, sale_total, validate_discount,
    AllocationError, BatchLot, Brand, Sale, SaleItem,
};

use crate::error::{AppError, AppResult};
use crate::services::{barcode, inventory, ledger, pricing};
use crate::services::ledger::BatchPin;

/// How many times a sale is retried after a lock/serialization conflict
/// before the conflict is surfaced to the caller.
const MAX_CONFLICT_RETRIES: u32 = 3;

/// Sale consumption service
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
}

/// One requested sale line: either an inventory reference or a barcode.
#[derive(Debug, Clone, Deserialize)]
pub struct SaleLineInput {
    pub inventory_id: Option<i32>,
    pub barcode: Option<String>,
    pub qty: Decimal,
    pub brand: Option<String>,
    /// Pin pricing and allocation to one purchase.
    pub purchase_id: Option<i32>,
    /// Pin pricing and allocation to one intake date.
    pub purchase_date: Option<String>,
}

/// Input for recording a sale
#[derive(Debug, Deserialize)]
pub struct CreateSaleInput {
    pub sale_invoice_no: Option<String>,
    pub customer_name: Option<String>,
    pub contact_no: Option<String>,
    pub address: Option<String>,
    pub date: Option<String>,
    pub total_amount: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub note: Option<String>,
    pub items: Vec<SaleLineInput>,
}

/// A completed sale with its lines.
#[derive(Debug, Serialize)]
pub struct SaleCreated {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// A sale as listed: header, customer fields, lines.
#[derive(Debug, Serialize)]
pub struct SaleWithItems {
    #[serde(flatten)]
    pub sale: Sale,
    pub customer_name: Option<String>,
    pub contact_no: Option<String>,
    pub items: Vec<SaleItem>,
}

#[derive(Debug, FromRow)]
struct SaleHeaderRow {
    sale_id: i32,
    sale_invoice_no: Option<String>,
    customer_id: Option<i32>,
    sale_date: NaiveDate,
    total_amount: Option<Decimal>,
    discount: Option<Decimal>,
    note: Option<String>,
    customer_name: Option<String>,
    contact_no: Option<String>,
}

#[derive(Debug, FromRow)]
struct SaleItemRow {
    sales_item_id: i32,
    sale_id: i32,
    inventory_id: i32,
    qty: Decimal,
    brand: Option<String>,
    unit_price: Decimal,
    selling_price: Decimal,
    profit: Decimal,
}

impl From<SaleItemRow> for SaleItem {
    fn from(row: SaleItemRow) -> Self {
        SaleItem {
            sales_item_id: row.sales_item_id,
            sale_id: row.sale_id,
            inventory_id: row.inventory_id,
            qty: row.qty,
            brand: Brand::normalize(row.brand.as_deref()),
            unit_price: row.unit_price,
            selling_price: row.selling_price,
            profit: row.profit,
        }
    }
}

/// A line's identity after barcode/inventory resolution.
struct ResolvedLine {
    inventory_id: i32,
    product_id: i32,
    vendor_id: i32,
    brand: Option<Brand>,
    pin: BatchPin,
}

impl SaleService {
    /// Create a new SaleService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a sale, retrying the whole workflow on a concurrency conflict.
    pub async fn create_sale(&self, input: CreateSaleInput) -> AppResult<SaleCreated> {
        self.validate(&input)?;

        let mut attempt = 0;
        loop {
            match self.try_create_sale(&input).await {
                Err(AppError::ConcurrencyConflict) if attempt < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    tracing::warn!(attempt, "sale hit a concurrency conflict, retrying");
                }
                other => return other,
            }
        }
    }

    fn validate(&self, input: &CreateSaleInput) -> AppResult<()> {
        if input.items.is_empty() {
            return Err(AppError::Validation {
                field: "items".to_string(),
                message: "A sale needs at least one line".to_string(),
            });
        }
        if let Some(discount) = input.discount {
            validate_discount(discount).map_err(|message| AppError::Validation {
                field: "discount".to_string(),
                message,
            })?;
        }
        for (idx, line) in input.items.iter().enumerate() {
            if line.inventory_id.is_none() && line.barcode.is_none() {
                return Err(AppError::Validation {
                    field: format!("items[{}]", idx),
                    message: "Each line needs an inventory_id or a barcode".to_string(),
                });
            }
        }
        Ok(())
    }

    async fn try_create_sale(&self, input: &CreateSaleInput) -> AppResult<SaleCreated> {
        let sale_date = match &input.date {
            Some(raw) => parse_flexible_date(raw).ok_or_else(|| AppError::Validation {
                field: "date".to_string(),
                message: format!("Unparseable date: {}", raw),
            })?,
            None => Utc::now().date_naive(),
        };

        let mut tx: Transaction<'_, Postgres> = self.db.begin().await?;

        let customer_id = match &input.customer_name {
            Some(name) => Some(
                find_or_create_customer(
                    &mut tx,
                    name,
                    input.contact_no.as_deref(),
                    input.address.as_deref(),
                )
                .await?,
            ),
            None => None,
        };

        let sale_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO sales (sale_invoice_no, customer_id, sale_date, total_amount, discount, note)
            VALUES ($1, $2, $3, NULL, $4, $5)
            RETURNING sale_id
            "#,
        )
        .bind(&input.sale_invoice_no)
        .bind(customer_id)
        .bind(sale_date)
        .bind(input.discount)
        .bind(&input.note)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(input.items.len());
        let mut total = Decimal::ZERO;

        for line in &input.items {
            let (item, line_amount) = self.consume_line(&mut tx, sale_id, line).await?;
            total += line_amount;
            items.push(item);
        }

        let final_total = sale_total(input.total_amount, total, input.discount);
        sqlx::query("UPDATE sales SET total_amount = $1 WHERE sale_id = $2")
            .bind(final_total)
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(sale_id, lines = items.len(), total = %final_total, "sale recorded");

        Ok(SaleCreated {
            sale: Sale {
                sale_id,
                sale_invoice_no: input.sale_invoice_no.clone(),
                customer_id,
                sale_date,
                total_amount: final_total,
                discount: input.discount,
                note: input.note.clone(),
            },
            items,
        })
    }

    /// Process one line: resolve identity, price it, allocate FIFO, record
    /// the line and its batch allocations, recompute the aggregate.
    async fn consume_line(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        sale_id: i32,
        line: &SaleLineInput,
    ) -> AppResult<(SaleItem, Decimal)> {
        let resolved = self.resolve_line(&mut *tx, line).await?;

        // Pricing: pinned to the purchase when the line came from a barcode
        // or carries an explicit pin, most-relevant-batch otherwise.
        let price = match resolved.pin {
            BatchPin::Purchase(purchase_id) => {
                pricing::resolve_for_purchase(&mut *tx, purchase_id, resolved.product_id).await?
            }
            BatchPin::Date(date) => {
                pricing::resolve(
                    &mut *tx,
                    resolved.product_id,
                    resolved.vendor_id,
                    &resolved.brand,
                    Some(date),
                )
                .await?
            }
            BatchPin::None => {
                pricing::resolve(
                    &mut *tx,
                    resolved.product_id,
                    resolved.vendor_id,
                    &resolved.brand,
                    None,
                )
                .await?
            }
        };

        let kind = pricing::product_unit_kind(&mut *tx, resolved.product_id).await?;
        let quote = price.quote(kind);

        let amount = line_total(kind, quote.selling_price, line.qty);
        let profit = line_profit(quote.selling_price, quote.unit_price, line.qty);

        // FIFO allocation over locked batches.
        let batches = ledger::live_batches_for_update(
            &mut *tx,
            resolved.product_id,
            resolved.vendor_id,
            &resolved.brand,
            resolved.pin,
        )
        .await?;

        let lots: Vec<BatchLot> = batches
            .iter()
            .map(|b| BatchLot {
                batch_id: b.purchase_item_id,
                remaining_qty: b.remaining_qty,
            })
            .collect();

        let plan = plan_fifo(&lots, line.qty).map_err(|e| match e {
            AllocationError::Insufficient { requested, available } => {
                AppError::InsufficientStock { requested, available }
            }
            AllocationError::NonPositiveQuantity(qty) => AppError::Validation {
                field: "qty".to_string(),
                message: format!("quantity must be positive, got {}", qty),
            },
        })?;

        let item_row = sqlx::query_as::<_, SaleItemRow>(
            r#"
            INSERT INTO sales_items (sale_id, inventory_id, qty, brand, unit_price, selling_price, profit)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING sales_item_id, sale_id, inventory_id, qty, brand, unit_price, selling_price, profit
            "#,
        )
        .bind(sale_id)
        .bind(resolved.inventory_id)
        .bind(line.qty)
        .bind(resolved.brand.as_ref().map(|b| b.as_str()))
        .bind(quote.unit_price)
        .bind(quote.selling_price)
        .bind(profit)
        .fetch_one(&mut **tx)
        .await?;

        for allocation in &plan {
            ledger::decrement_remaining(&mut *tx, allocation.batch_id, allocation.qty).await?;
            sqlx::query(
                r#"
                INSERT INTO sales_item_allocations (sales_item_id, purchase_item_id, qty)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(item_row.sales_item_id)
            .bind(allocation.batch_id)
            .bind(allocation.qty)
            .execute(&mut **tx)
            .await?;
        }

        inventory::recompute_key(
            &mut *tx,
            resolved.product_id,
            resolved.vendor_id,
            &resolved.brand,
        )
        .await?;

        Ok((item_row.into(), amount))
    }

    /// Resolve a line to its inventory identity.
    ///
    /// Barcode lines re-derive the aggregate key from the resolved purchase's
    /// vendor and the batch brand; direct lines use the aggregate row as-is
    /// with an optional caller brand override.
    async fn resolve_line(
        &self,
        conn: &mut PgConnection,
        line: &SaleLineInput,
    ) -> AppResult<ResolvedLine> {
        if let Some(code) = &line.barcode {
            let resolved = barcode::resolve_code(conn, code).await?;

            let vendor_id = sqlx::query_scalar::<_, i32>(
                "SELECT vendor_id FROM purchases WHERE purchase_id = $1",
            )
            .bind(resolved.purchase_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| {
                AppError::InvalidReference(format!("purchase {}", resolved.purchase_id))
            })?;

            // Brand recorded at intake wins over whatever the barcode embeds.
            let batch_brand = sqlx::query_scalar::<_, Option<String>>(
                r#"
                SELECT brand FROM purchase_items
                WHERE purchase_id = $1 AND product_id = $2
                ORDER BY purchase_item_id DESC
                LIMIT 1
                "#,
            )
            .bind(resolved.purchase_id)
            .bind(resolved.product_id)
            .fetch_optional(&mut *conn)
            .await?
            .flatten();

            let brand = Brand::normalize(batch_brand.as_deref()).or(resolved.brand);

            let item = inventory::get_by_key(conn, resolved.product_id, vendor_id, &brand)
                .await?
                .ok_or_else(|| {
                    AppError::InvalidReference(format!("inventory item for barcode {}", code))
                })?;

            return Ok(ResolvedLine {
                inventory_id: item.inventory_id,
                product_id: resolved.product_id,
                vendor_id,
                brand,
                pin: BatchPin::Purchase(resolved.purchase_id),
            });
        }

        let inventory_id = line.inventory_id.ok_or_else(|| AppError::Validation {
            field: "inventory_id".to_string(),
            message: "Line has neither inventory_id nor barcode".to_string(),
        })?;

        let item = inventory::get_by_id(conn, inventory_id).await?;
        let brand = Brand::normalize(line.brand.as_deref()).or(item.brand);

        let pin = if let Some(purchase_id) = line.purchase_id {
            BatchPin::Purchase(purchase_id)
        } else if let Some(raw) = &line.purchase_date {
            BatchPin::Date(parse_flexible_date(raw).ok_or_else(|| AppError::Validation {
                field: "purchase_date".to_string(),
                message: format!("Unparseable date: {}", raw),
            })?)
        } else {
            BatchPin::None
        };

        Ok(ResolvedLine {
            inventory_id,
            product_id: item.product_id,
            vendor_id: item.vendor_id,
            brand,
            pin,
        })
    }

    /// List sales newest-first with customer fields and lines.
    pub async fn list_sales(&self) -> AppResult<Vec<SaleWithItems>> {
        let headers = sqlx::query_as::<_, SaleHeaderRow>(
            r#"
            SELECT s.sale_id, s.sale_invoice_no, s.customer_id, s.sale_date, s.total_amount,
                   s.discount, s.note, c.name AS customer_name, c.contact_no
            FROM sales s
            LEFT JOIN customers c ON c.customer_id = s.customer_id
            ORDER BY s.sale_id DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let items = sqlx::query_as::<_, SaleItemRow>(
            r#"
            SELECT sales_item_id, sale_id, inventory_id, qty, brand, unit_price, selling_price, profit
            FROM sales_items
            ORDER BY sales_item_id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut by_sale: std::collections::HashMap<i32, Vec<SaleItem>> =
            std::collections::HashMap::new();
        for item in items {
            by_sale.entry(item.sale_id).or_default().push(item.into());
        }

        Ok(headers
            .into_iter()
            .map(|h| SaleWithItems {
                sale: Sale {
                    sale_id: h.sale_id,
                    sale_invoice_no: h.sale_invoice_no,
                    customer_id: h.customer_id,
                    sale_date: h.sale_date,
                    total_amount: h.total_amount.unwrap_or_default(),
                    discount: h.discount,
                    note: h.note,
                },
                customer_name: h.customer_name,
                contact_no: h.contact_no,
                items: by_sale.remove(&h.sale_id).unwrap_or_default(),
            })
            .collect())
    }
}

/// Find a customer by (name, contact) or create one.
async fn find_or_create_customer(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
    contact_no: Option<&str>,
    address: Option<&str>,
) -> AppResult<i32> {
    let existing = sqlx::query_scalar::<_, i32>(
        "SELECT customer_id FROM customers WHERE name = $1 AND (contact_no IS NOT DISTINCT FROM $2)",
    )
    .bind(name)
    .bind(contact_no)
    .fetch_optional(&mut **tx)
    .await?;

    if let Some(customer_id) = existing {
        return Ok(customer_id);
    }

    let customer_id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO customers (name, contact_no, address) VALUES ($1, $2, $3) RETURNING customer_id",
    )
    .bind(name)
    .bind(contact_no)
    .bind(address)
    .fetch_one(&mut **tx)
    .await?;

    Ok(customer_id)
}
