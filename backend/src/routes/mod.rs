//! Route definitions for the BakeStock backend

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - purchase intake
        .nest("/purchases", purchase_routes())
        // Protected routes - sale consumption
        .nest("/sales", sale_routes())
        // Protected routes - inventory and pricing
        .nest("/inventory", inventory_routes())
        // Protected routes - barcodes
        .nest("/barcodes", barcode_routes())
}

/// Purchase intake routes (protected)
fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_purchases).post(handlers::create_purchase))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Sale consumption routes (protected)
fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Inventory and pricing routes (protected)
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_inventory))
        .route("/rebuild", post(handlers::rebuild_inventory))
        .route("/unit-price-by-barcode/:barcode", get(handlers::get_unit_price_by_barcode))
        .route("/:inventory_id/unit-price", get(handlers::get_unit_price))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Barcode routes (protected)
fn barcode_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_barcode))
        .route("/:code", get(handlers::resolve_barcode))
        .route_layer(middleware::from_fn(auth_middleware))
}
