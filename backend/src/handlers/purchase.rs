//! HTTP handlers for purchase intake endpoints

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::purchase::{
    CreatePurchaseInput, PurchaseCreated, PurchaseService, PurchaseWithItems,
};
use crate::AppState;

/// Record a purchase intake
pub async fn create_purchase(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<CreatePurchaseInput>,
) -> AppResult<Json<PurchaseCreated>> {
    let service = PurchaseService::new(state.db);
    let created = service.create_purchase(input).await?;
    Ok(Json(created))
}

#[derive(Serialize)]
pub struct PurchaseListResponse {
    pub purchases: Vec<PurchaseWithItems>,
}

/// List purchases with their items
pub async fn list_purchases(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<PurchaseListResponse>> {
    let service = PurchaseService::new(state.db);
    let purchases = service.list_purchases().await?;
    Ok(Json(PurchaseListResponse { purchases }))
}
