use axum::{routing::get, Router};

use crate::handlers::price_rule;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/price-rules",
            get(price_rule::list_price_rules).post(price_rule::create_price_rule),
        )
        .route("/price-rules/{id}", axum::routing::delete(price_rule::delete_price_rule))
        .route_layer(axum::middleware::from_fn(require_auth))
}
