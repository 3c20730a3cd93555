use axum::{routing::post, Router};

use crate::handlers::user;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    // Login stays outside the auth layer.
    Router::new().route("/auth/login", post(user::login))
}
