//! Barcode service
//!
//! Creation (with auto-generated strings) and resolution of barcodes.
//! Resolution tries the stored row first and only falls back to parsing the
//! string itself; when both contribute a field, the row wins.

use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{FromRow, PgConnection, PgPool};
use validator::Validate;

use shared::{
    brand_to_sql, generate_barcode, normalize_invoice, parse_barcode, parse_flexible_date,
    BarcodeIdentity, BarcodeRecord, Brand, ResolvedBarcode,
};

use crate::error::{AppError, AppResult};

/// Barcode service for creation and row-backed lookups
#[derive(Clone)]
pub struct BarcodeService {
    db: PgPool,
}

/// Input for creating a barcode. The string is generated from the sourcing
/// context when omitted.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBarcodeInput {
    pub product_id: i32,
    #[validate(length(min = 1))]
    pub barcode: Option<String>,
    pub purchase_id: Option<i32>,
    pub invoice_no: Option<String>,
    pub brand: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, FromRow)]
struct BarcodeRow {
    barcode_id: i32,
    barcode: String,
    product_id: i32,
    purchase_id: Option<i32>,
    invoice_no: Option<String>,
    brand: Option<String>,
    purchase_date: Option<NaiveDate>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<BarcodeRow> for BarcodeRecord {
    fn from(row: BarcodeRow) -> Self {
        BarcodeRecord {
            barcode_id: row.barcode_id,
            barcode: row.barcode,
            product_id: row.product_id,
            purchase_id: row.purchase_id,
            invoice_no: row.invoice_no,
            brand: Brand::normalize(row.brand.as_deref()),
            purchase_date: row.purchase_date,
            created_at: row.created_at,
        }
    }
}

impl BarcodeService {
    /// Create a new BarcodeService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a barcode record, generating the string when none is supplied.
    /// A duplicate string surfaces as `Conflict`; a bad product or purchase
    /// reference as `InvalidReference`.
    pub async fn create(&self, input: CreateBarcodeInput) -> AppResult<BarcodeRecord> {
        input.validate().map_err(|e| AppError::Validation {
            field: "barcode".to_string(),
            message: e.to_string(),
        })?;

        let brand = Brand::normalize(input.brand.as_deref());
        let date = match &input.date {
            Some(raw) => Some(parse_flexible_date(raw).ok_or_else(|| AppError::Validation {
                field: "date".to_string(),
                message: format!("Unparseable date: {}", raw),
            })?),
            None => None,
        };

        let code = match input.barcode {
            Some(code) => code,
            None => generate_barcode(
                input.product_id,
                input.purchase_id,
                &brand,
                input.invoice_no.as_deref(),
                date,
            ),
        };

        let row = sqlx::query_as::<_, BarcodeRow>(
            r#"
            INSERT INTO barcodes (barcode, product_id, purchase_id, invoice_no, brand, purchase_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING barcode_id, barcode, product_id, purchase_id, invoice_no, brand,
                      purchase_date, created_at
            "#,
        )
        .bind(&code)
        .bind(input.product_id)
        .bind(input.purchase_id)
        .bind(&input.invoice_no)
        .bind(brand_to_sql(&brand))
        .bind(date)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Resolve a barcode outside any larger transaction.
    pub async fn resolve(&self, code: &str) -> AppResult<ResolvedBarcode> {
        let mut conn = self.db.acquire().await?;
        resolve_code(&mut conn, code).await
    }
}

/// Resolve a scanned barcode to its terminal
/// (product, purchase, brand, invoice) identity.
///
/// Row lookup first; a missing or incomplete row falls back to the parsed
/// string, with row fields taking precedence. A purchase id that neither
/// source provides is re-derived from the invoice number ("most recent
/// purchase with this invoice carrying this product"); failing that the
/// code does not resolve.
pub async fn resolve_code(conn: &mut PgConnection, code: &str) -> AppResult<ResolvedBarcode> {
    let row = sqlx::query_as::<_, BarcodeRow>(
        r#"
        SELECT barcode_id, barcode, product_id, purchase_id, invoice_no, brand,
               purchase_date, created_at
        FROM barcodes
        WHERE barcode = $1
        "#,
    )
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;

    let identity = match row {
        Some(row) => BarcodeIdentity::RowBacked(row.into()),
        None => match parse_barcode(code) {
            Some(parsed) => BarcodeIdentity::ParsedFromString(parsed),
            None => return Err(AppError::NotFound("Barcode".to_string())),
        },
    };

    let (product_id, purchase_id, brand, invoice_no) = match identity {
        BarcodeIdentity::RowBacked(record) => {
            // An incomplete row may still be filled in from the string.
            let parsed = if record.purchase_id.is_none() || record.brand.is_none() {
                parse_barcode(&record.barcode)
            } else {
                None
            };
            (
                record.product_id,
                record
                    .purchase_id
                    .or_else(|| parsed.as_ref().map(|p| p.purchase_id)),
                record.brand.or_else(|| parsed.as_ref().and_then(|p| p.brand.clone())),
                record
                    .invoice_no
                    .or_else(|| parsed.and_then(|p| p.invoice_no)),
            )
        }
        BarcodeIdentity::ParsedFromString(parsed) => (
            parsed.product_id,
            Some(parsed.purchase_id),
            parsed.brand,
            parsed.invoice_no,
        ),
    };

    let purchase_id = match purchase_id {
        Some(id) => id,
        None => match &invoice_no {
            Some(invoice) => purchase_by_invoice(conn, invoice, product_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Barcode purchase".to_string()))?,
            None => return Err(AppError::NotFound("Barcode purchase".to_string())),
        },
    };

    Ok(ResolvedBarcode {
        product_id,
        purchase_id,
        brand,
        invoice_no,
    })
}

/// Most recent purchase with the given invoice number that carries the
/// product. Barcode segments embed the normalized (uppercased, whitespace
/// stripped) form, so the stored invoice is normalized the same way before
/// comparing.
async fn purchase_by_invoice(
    conn: &mut PgConnection,
    invoice_no: &str,
    product_id: i32,
) -> AppResult<Option<i32>> {
    let purchase_id = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT pr.purchase_id
        FROM purchases pr
        JOIN purchase_items pi ON pi.purchase_id = pr.purchase_id
        WHERE UPPER(REGEXP_REPLACE(pr.invoice_no, '\s', '', 'g')) = $1
          AND pi.product_id = $2
        ORDER BY pr.purchase_date DESC, pr.purchase_id DESC
        LIMIT 1
        "#,
    )
    .bind(normalize_invoice(invoice_no))
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(purchase_id)
}
