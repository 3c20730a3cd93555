// src/state.rs
use sqlx::PgPool;

use crate::events::PosEventHub;
use crate::ml::MlClient;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub event_hub: PosEventHub,
    pub ml_client: MlClient,
}

impl AppState {
    pub fn new(db_pool: PgPool, ml_client: MlClient) -> Self {
        Self {
            db_pool,
            event_hub: PosEventHub::new(),
            ml_client,
        }
    }
}
