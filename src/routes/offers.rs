use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::offer;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/offers", get(offer::list_offers).post(offer::create_offer))
        .route("/offers/validate", post(offer::validate_offer))
        .route("/offers/{id}", get(offer::get_offer).delete(offer::delete_offer))
        .route_layer(axum::middleware::from_fn(require_auth))
}
