use axum::{routing::get, Router};

use crate::handlers::inventory;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/inventory", get(inventory::inventory_summary))
        .route("/inventory/reorder-alerts", get(inventory::reorder_alerts))
        .route("/inventory/product/{product_id}", get(inventory::get_product_inventory))
        .route_layer(axum::middleware::from_fn(require_auth))
}
