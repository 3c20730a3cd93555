use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::transaction;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(transaction::checkout))
        .route("/transactions", get(transaction::list_transactions))
        .route(
            "/transactions/{id}",
            get(transaction::get_transaction).put(transaction::update_transaction),
        )
        .route(
            "/transactions/{id}/receipt",
            get(transaction::get_transaction_receipt),
        )
        .route("/transactions/return", post(transaction::create_return))
        .route(
            "/transactions/compute-balance",
            post(transaction::compute_balance_preview),
        )
        .route_layer(axum::middleware::from_fn(require_auth))
}
