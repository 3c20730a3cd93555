use axum::{routing::get, Router};

use crate::handlers::events;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(events::event_stream))
        .route_layer(axum::middleware::from_fn(require_auth))
}
