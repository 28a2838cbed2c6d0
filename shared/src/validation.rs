//! Input validation helpers shared by the request boundary

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;

/// Validate a requested or intake quantity: must be strictly positive.
pub fn validate_quantity(qty: Decimal) -> Result<(), String> {
    if qty <= Decimal::ZERO {
        return Err(format!("quantity must be positive, got {}", qty));
    }
    Ok(())
}

/// Validate a discount percentage: 0 to 100 inclusive.
pub fn validate_discount(discount: Decimal) -> Result<(), String> {
    if discount < Decimal::ZERO || discount > Decimal::ONE_HUNDRED {
        return Err(format!("discount must be between 0 and 100, got {}", discount));
    }
    Ok(())
}

/// Parse a date that may arrive as `YYYY-MM-DD` or as a full timestamp.
/// Only the date portion is significant.
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.date_naive());
    }
    let date_part = trimmed.get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
