//! HTTP handlers for sale consumption endpoints

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::sale::{CreateSaleInput, SaleCreated, SaleService, SaleWithItems};
use crate::AppState;

/// Record a sale: prices, allocates and decrements stock atomically
pub async fn create_sale(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<CreateSaleInput>,
) -> AppResult<Json<SaleCreated>> {
    let service = SaleService::new(state.db);
    let created = service.create_sale(input).await?;
    Ok(Json(created))
}

#[derive(Serialize)]
pub struct SaleListResponse {
    pub sales: Vec<SaleWithItems>,
}

/// List sales with customer fields and lines
pub async fn list_sales(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<SaleListResponse>> {
    let service = SaleService::new(state.db);
    let sales = service.list_sales().await?;
    Ok(Json(SaleListResponse { sales }))
}
