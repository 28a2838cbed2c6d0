//! Barcode string codec
//!
//! Two historical encodings share the `BC-` prefix:
//!
//! - Shape A ("invoice-bound"): `BC-<product>[-<brand>][-<INVOICE>][-<YYYYMMDD>]`.
//!   The database row stores the fields explicitly; the embedded structure is
//!   informational and never re-parsed when a row exists.
//! - Shape B ("purchase-bound"): `BC-<product>-<purchase>[-<brand>][-<INVOICE>]`.
//!   When the row is missing or incomplete the string itself is parsed, with
//!   a fixed precedence of patterns.
//!
//! Resolution of a scanned code is a tagged union: row-backed identity first,
//! string-parsed identity as the fallback, so the chain stays auditable.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::Brand;

// Parse precedence: most specific pattern first.
static RE_PRODUCT_PURCHASE_BRAND_INVOICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^BC-(\d+)-(\d+)-([^-]+)-(.*)$").unwrap());
static RE_PRODUCT_PURCHASE_INVOICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^BC-(\d+)-(\d+)-(.*)$").unwrap());
static RE_PRODUCT_PURCHASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^BC-(\d+)-(\d+)$").unwrap());

/// Identity parsed out of a bare barcode string (Shape B fallback).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedBarcode {
    pub product_id: i32,
    pub purchase_id: i32,
    pub brand: Option<Brand>,
    pub invoice_no: Option<String>,
}

/// Normalize an invoice segment for embedding: uppercase, whitespace stripped.
pub fn normalize_invoice(invoice: &str) -> String {
    invoice
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Generate a barcode string.
///
/// With a purchase id the purchase-bound shape is produced
/// (`BC-<product>-<purchase>[-<brand>][-<INVOICE>]`), otherwise the
/// invoice-bound shape (`BC-<product>[-<brand>][-<INVOICE>][-<YYYYMMDD>]`).
/// Optional segments are omitted entirely; a naked trailing hyphen is never
/// emitted.
pub fn generate_barcode(
    product_id: i32,
    purchase_id: Option<i32>,
    brand: &Option<Brand>,
    invoice_no: Option<&str>,
    date: Option<NaiveDate>,
) -> String {
    let mut segments = vec![format!("BC-{}", product_id)];

    if let Some(purchase_id) = purchase_id {
        segments.push(purchase_id.to_string());
    }
    if let Some(brand) = brand {
        segments.push(brand.as_str().to_string());
    }
    if let Some(invoice) = invoice_no {
        let normalized = normalize_invoice(invoice);
        if !normalized.is_empty() {
            segments.push(normalized);
        }
    }
    if purchase_id.is_none() {
        if let Some(date) = date {
            segments.push(date.format("%Y%m%d").to_string());
        }
    }

    segments.join("-")
}

/// Parse a Shape B barcode string, trying the pattern chain in precedence
/// order: product-purchase-brand-invoice, product-purchase-invoice, bare
/// product-purchase. Returns `None` for anything that does not carry an
/// embedded purchase id.
pub fn parse_barcode(code: &str) -> Option<ParsedBarcode> {
    if let Some(caps) = RE_PRODUCT_PURCHASE_BRAND_INVOICE.captures(code) {
        // The 4-segment pattern wins outright; an empty tail is simply a
        // missing invoice, the third segment stays a brand.
        let invoice = caps[4].to_string();
        return Some(ParsedBarcode {
            product_id: caps[1].parse().ok()?,
            purchase_id: caps[2].parse().ok()?,
            brand: Brand::normalize(Some(&caps[3])),
            invoice_no: if invoice.is_empty() { None } else { Some(invoice) },
        });
    }
    if let Some(caps) = RE_PRODUCT_PURCHASE_INVOICE.captures(code) {
        let invoice = caps[3].to_string();
        return Some(ParsedBarcode {
            product_id: caps[1].parse().ok()?,
            purchase_id: caps[2].parse().ok()?,
            brand: None,
            invoice_no: if invoice.is_empty() { None } else { Some(invoice) },
        });
    }
    if let Some(caps) = RE_PRODUCT_PURCHASE.captures(code) {
        return Some(ParsedBarcode {
            product_id: caps[1].parse().ok()?,
            purchase_id: caps[2].parse().ok()?,
            brand: None,
            invoice_no: None,
        });
    }
    None
}
