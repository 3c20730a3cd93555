use axum::{routing::get, Router};

use crate::handlers::currency;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/currency/rates",
            get(currency::list_rates).post(currency::create_rate),
        )
        .route("/currency/rates/current", get(currency::get_current_rate))
        .route_layer(axum::middleware::from_fn(require_auth))
}
