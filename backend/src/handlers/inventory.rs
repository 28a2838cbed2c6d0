//! HTTP handlers for inventory endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use shared::parse_flexible_date;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::inventory::{InventoryService, StockRow};
use crate::services::pricing::{BarcodeQuote, InventoryQuote, PricingService};
use crate::AppState;

#[derive(Serialize)]
pub struct StockListResponse {
    pub inventory: Vec<StockRow>,
}

/// List live stock (batches with remaining quantity)
pub async fn list_inventory(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<StockListResponse>> {
    let service = InventoryService::new(state.db);
    let inventory = service.list_stock().await?;
    Ok(Json(StockListResponse { inventory }))
}

#[derive(Serialize)]
pub struct RebuildResponse {
    pub ok: bool,
    pub updated: u64,
}

/// Rebuild every aggregate row from the batch ledger
pub async fn rebuild_inventory(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<RebuildResponse>> {
    let service = InventoryService::new(state.db);
    let updated = service.rebuild_all().await?;
    Ok(Json(RebuildResponse { ok: true, updated }))
}

#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    pub date: Option<String>,
    pub brand: Option<String>,
}

/// Quote unit cost and selling price for an inventory row
pub async fn get_unit_price(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(inventory_id): Path<i32>,
    Query(query): Query<PriceQuery>,
) -> AppResult<Json<InventoryQuote>> {
    let date = match &query.date {
        Some(raw) => Some(parse_flexible_date(raw).ok_or_else(|| AppError::Validation {
            field: "date".to_string(),
            message: format!("Unparseable date: {}", raw),
        })?),
        None => None,
    };

    let service = PricingService::new(state.db);
    let quote = service
        .quote_for_inventory(inventory_id, date, query.brand.as_deref())
        .await?;
    Ok(Json(quote))
}

/// Quote by scanned barcode
pub async fn get_unit_price_by_barcode(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(code): Path<String>,
) -> AppResult<Json<BarcodeQuote>> {
    let code = code.trim();
    if code.is_empty() {
        return Err(AppError::Validation {
            field: "barcode".to_string(),
            message: "Missing barcode".to_string(),
        });
    }

    let service = PricingService::new(state.db);
    let quote = service.quote_for_barcode(code).await?;
    Ok(Json(quote))
}
