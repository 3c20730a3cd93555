use axum::{routing::get, Router};

use crate::handlers::purchase;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/purchases",
            get(purchase::list_purchases).post(purchase::create_purchase),
        )
        .route(
            "/purchases/{id}",
            get(purchase::get_purchase).delete(purchase::delete_purchase),
        )
        .route_layer(axum::middleware::from_fn(require_auth))
}
