use axum::{routing::get, Router};

use crate::handlers::my_cart;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/my-cart/summary", get(my_cart::my_cart_summary))
        .route("/my-cart/purchases", get(my_cart::list_my_purchases))
        .route_layer(axum::middleware::from_fn(require_auth))
}
