//! Pricing resolver
//!
//! Derives unit cost and selling price for an inventory key from the most
//! relevant ledger batch. Brand is often recorded inconsistently at the line
//! level versus intake, so resolution walks a fallback chain:
//!
//! 1. brand (or override) match, exact date when a date filter is given
//! 2. same product + vendor + date, ignoring brand
//! 3. brand match, most recent regardless of date
//! 4. most recent for product + vendor regardless of brand and date
//!
//! Absence of any batch is a recoverable `NotFound`: the item simply cannot
//! be quoted or sold yet.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};

use shared::{brand_to_sql, quote_selling_price, Brand, UnitKind};

use crate::error::{AppError, AppResult};
use crate::services::{barcode, inventory};

/// The batch-sourced price figures before unit-kind derivation.
#[derive(Debug, Clone, FromRow)]
pub struct ResolvedPrice {
    pub purchase_item_id: i32,
    pub purchase_id: i32,
    pub unit_price: Decimal,
    pub selling_price: Option<Decimal>,
    pub brand: Option<String>,
}

/// A fully derived quote: unit cost plus a selling price that is either the
/// stored one or derived per the product's unit kind.
#[derive(Debug, Clone)]
pub struct PriceQuote {
    pub unit_price: Decimal,
    pub selling_price: Decimal,
}

impl ResolvedPrice {
    /// Apply the unit-kind rounding rule when no selling price was stored.
    pub fn quote(&self, kind: UnitKind) -> PriceQuote {
        PriceQuote {
            unit_price: self.unit_price,
            selling_price: quote_selling_price(self.selling_price, self.unit_price, kind),
        }
    }
}

const SELECT: &str = r#"
    SELECT pi.purchase_item_id, pi.purchase_id, pi.unit_price, pi.selling_price, pi.brand
    FROM purchase_items pi
    JOIN purchases pr ON pr.purchase_id = pi.purchase_id
"#;
const ORDER: &str = " ORDER BY pr.purchase_date DESC, pi.purchase_item_id DESC LIMIT 1";

/// Resolve pricing for a batch pinned to a specific purchase (the barcode
/// path): latest line of that purchase for the product.
pub async fn resolve_for_purchase(
    conn: &mut PgConnection,
    purchase_id: i32,
    product_id: i32,
) -> AppResult<ResolvedPrice> {
    sqlx::query_as::<_, ResolvedPrice>(&format!(
        "{} WHERE pi.purchase_id = $1 AND pi.product_id = $2{}",
        SELECT, ORDER
    ))
    .bind(purchase_id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Pricing batch".to_string()))
}

/// Resolve pricing for an inventory key through the fallback chain.
///
/// `brand` is the already-overridden brand to try first; `date` narrows the
/// first two steps to an exact intake date.
pub async fn resolve(
    conn: &mut PgConnection,
    product_id: i32,
    vendor_id: i32,
    brand: &Option<Brand>,
    date: Option<NaiveDate>,
) -> AppResult<ResolvedPrice> {
    if let Some(date) = date {
        // Step 1: brand match on the exact date.
        if let Some(found) = query_with_brand(conn, product_id, vendor_id, brand, Some(date)).await? {
            return Ok(found);
        }
        // Step 2: same date, any brand.
        if let Some(found) = query_any_brand(conn, product_id, vendor_id, Some(date)).await? {
            return Ok(found);
        }
    }
    // Step 3: brand match, most recent.
    if let Some(found) = query_with_brand(conn, product_id, vendor_id, brand, None).await? {
        return Ok(found);
    }
    // Step 4: most recent for the product + vendor.
    query_any_brand(conn, product_id, vendor_id, None)
        .await?
        .ok_or_else(|| AppError::NotFound("Pricing batch".to_string()))
}

async fn query_with_brand(
    conn: &mut PgConnection,
    product_id: i32,
    vendor_id: i32,
    brand: &Option<Brand>,
    date: Option<NaiveDate>,
) -> AppResult<Option<ResolvedPrice>> {
    let row = match date {
        Some(date) => {
            sqlx::query_as::<_, ResolvedPrice>(&format!(
                "{} WHERE pi.product_id = $1 AND pr.vendor_id = $2 \
                 AND (pi.brand IS NOT DISTINCT FROM $3) AND pr.purchase_date = $4{}",
                SELECT, ORDER
            ))
            .bind(product_id)
            .bind(vendor_id)
            .bind(brand_to_sql(brand))
            .bind(date)
            .fetch_optional(&mut *conn)
            .await?
        }
        None => {
            sqlx::query_as::<_, ResolvedPrice>(&format!(
                "{} WHERE pi.product_id = $1 AND pr.vendor_id = $2 \
                 AND (pi.brand IS NOT DISTINCT FROM $3){}",
                SELECT, ORDER
            ))
            .bind(product_id)
            .bind(vendor_id)
            .bind(brand_to_sql(brand))
            .fetch_optional(&mut *conn)
            .await?
        }
    };
    Ok(row)
}

async fn query_any_brand(
    conn: &mut PgConnection,
    product_id: i32,
    vendor_id: i32,
    date: Option<NaiveDate>,
) -> AppResult<Option<ResolvedPrice>> {
    let row = match date {
        Some(date) => {
            sqlx::query_as::<_, ResolvedPrice>(&format!(
                "{} WHERE pi.product_id = $1 AND pr.vendor_id = $2 AND pr.purchase_date = $3{}",
                SELECT, ORDER
            ))
            .bind(product_id)
            .bind(vendor_id)
            .bind(date)
            .fetch_optional(&mut *conn)
            .await?
        }
        None => {
            sqlx::query_as::<_, ResolvedPrice>(&format!(
                "{} WHERE pi.product_id = $1 AND pr.vendor_id = $2{}",
                SELECT, ORDER
            ))
            .bind(product_id)
            .bind(vendor_id)
            .fetch_optional(&mut *conn)
            .await?
        }
    };
    Ok(row)
}

/// Pool-holding facade for the quote endpoints.
#[derive(Clone)]
pub struct PricingService {
    db: PgPool,
}

/// Quote for an inventory row.
#[derive(Debug, Serialize)]
pub struct InventoryQuote {
    pub inventory_id: i32,
    pub unit_price: Decimal,
    pub selling_price: Decimal,
}

/// Quote resolved from a scanned barcode, with display fields for the
/// point-of-sale screen.
#[derive(Debug, Serialize)]
pub struct BarcodeQuote {
    pub inventory_id: i32,
    pub product_name: Option<String>,
    pub vendor_name: Option<String>,
    pub brand: Option<String>,
    pub unit_kind: String,
    pub unit_price: Decimal,
    pub selling_price: Decimal,
}

impl PricingService {
    /// Create a new PricingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Quote an inventory row, optionally scoped to an intake date and/or a
    /// brand override.
    pub async fn quote_for_inventory(
        &self,
        inventory_id: i32,
        date: Option<NaiveDate>,
        brand_override: Option<&str>,
    ) -> AppResult<InventoryQuote> {
        let mut conn = self.db.acquire().await?;

        let item = inventory::get_by_id(&mut conn, inventory_id)
            .await
            .map_err(|e| match e {
                AppError::InvalidReference(_) => AppError::NotFound("Inventory item".to_string()),
                other => other,
            })?;

        let brand = Brand::normalize(brand_override).or(item.brand);
        let price = resolve(&mut conn, item.product_id, item.vendor_id, &brand, date).await?;
        let kind = product_unit_kind(&mut conn, item.product_id).await?;
        let quote = price.quote(kind);

        Ok(InventoryQuote {
            inventory_id,
            unit_price: quote.unit_price,
            selling_price: quote.selling_price,
        })
    }

    /// Quote from a scanned barcode: resolve the code, pin pricing to the
    /// resolved purchase, and locate the matching inventory row.
    pub async fn quote_for_barcode(&self, code: &str) -> AppResult<BarcodeQuote> {
        let mut conn = self.db.acquire().await?;

        let resolved = barcode::resolve_code(&mut conn, code).await?;

        let vendor_id = sqlx::query_scalar::<_, i32>(
            "SELECT vendor_id FROM purchases WHERE purchase_id = $1",
        )
        .bind(resolved.purchase_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;

        let price = resolve_for_purchase(&mut conn, resolved.purchase_id, resolved.product_id).await?;
        let brand = Brand::normalize(price.brand.as_deref()).or(resolved.brand);

        let item = inventory::get_by_key(&mut conn, resolved.product_id, vendor_id, &brand)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;

        let kind = product_unit_kind(&mut conn, resolved.product_id).await?;
        let quote = price.quote(kind);

        let names = sqlx::query_as::<_, (Option<String>, Option<String>)>(
            r#"
            SELECT p.product_name, v.name
            FROM products p, vendors v
            WHERE p.product_id = $1 AND v.vendor_id = $2
            "#,
        )
        .bind(resolved.product_id)
        .bind(vendor_id)
        .fetch_optional(&mut *conn)
        .await?
        .unwrap_or((None, None));

        Ok(BarcodeQuote {
            inventory_id: item.inventory_id,
            product_name: names.0,
            vendor_name: names.1,
            brand: brand.map(|b| b.into_string()),
            unit_kind: kind.as_str().to_string(),
            unit_price: quote.unit_price,
            selling_price: quote.selling_price,
        })
    }
}

/// Look up a product's unit kind, needed to derive a selling price.
pub async fn product_unit_kind(conn: &mut PgConnection, product_id: i32) -> AppResult<UnitKind> {
    let raw = sqlx::query_scalar::<_, String>(
        "SELECT unit_kind::TEXT FROM products WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::InvalidReference(format!("product {}", product_id)))?;

    raw.parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))
}
