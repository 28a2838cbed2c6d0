//! HTTP handlers for barcode endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use shared::{BarcodeRecord, ResolvedBarcode};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::barcode::{BarcodeService, CreateBarcodeInput};
use crate::AppState;

#[derive(Serialize)]
pub struct BarcodeResponse {
    pub barcode: BarcodeRecord,
}

/// Create a barcode, generating the string when none is supplied
pub async fn create_barcode(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<CreateBarcodeInput>,
) -> AppResult<Json<BarcodeResponse>> {
    let service = BarcodeService::new(state.db);
    let barcode = service.create(input).await?;
    Ok(Json(BarcodeResponse { barcode }))
}

/// Resolve a barcode to its (product, purchase, brand, invoice) identity
pub async fn resolve_barcode(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(code): Path<String>,
) -> AppResult<Json<ResolvedBarcode>> {
    let service = BarcodeService::new(state.db);
    let resolved = service.resolve(code.trim()).await?;
    Ok(Json(resolved))
}
