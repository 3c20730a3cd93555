use axum::{extract::Path, extract::State, Extension, Json};
use tracing::instrument;

use crate::dtos::inventory::{
    InventoryRecordResponse, InventorySummaryResponse, InventorySummaryRow,
    InventoryValuationResponse,
};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::inventory::InventoryRecord;
use crate::state::AppState;

/// Stock overview with per-item and aggregate valuation at average cost.
#[instrument(skip(state, auth))]
pub async fn inventory_summary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<InventoryValuationResponse>, AppError> {
    auth.require_privileged()?;

    let rows = sqlx::query_as::<_, InventorySummaryRow>(
        "SELECT i.product_id, p.name AS product_name, p.barcode,
                i.quantity_on_hand, i.reorder_point, i.is_reorder_alarm_enabled,
                i.average_cost_usd, i.average_cost_lbp, i.last_restocked_at
         FROM inventory i
         JOIN products p ON p.id = i.product_id
         WHERE p.is_active = TRUE
         ORDER BY p.name",
    )
    .fetch_all(&state.db_pool)
    .await?;

    let items: Vec<InventorySummaryResponse> =
        rows.into_iter().map(InventorySummaryResponse::from).collect();
    Ok(Json(InventoryValuationResponse::from_items(items)))
}

/// Stock record for a single product; any cashier may look this up.
#[instrument(skip(state))]
pub async fn get_product_inventory(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> Result<Json<InventoryRecordResponse>, AppError> {
    let record = sqlx::query_as::<_, InventoryRecord>(
        "SELECT * FROM inventory WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found(format!("No inventory record for product {product_id}")))?;

    Ok(Json(InventoryRecordResponse::from(record)))
}

/// Items at or below their reorder point, for the restock screen.
#[instrument(skip(state, auth))]
pub async fn reorder_alerts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<InventorySummaryResponse>>, AppError> {
    auth.require_privileged()?;

    let rows = sqlx::query_as::<_, InventorySummaryRow>(
        "SELECT i.product_id, p.name AS product_name, p.barcode,
                i.quantity_on_hand, i.reorder_point, i.is_reorder_alarm_enabled,
                i.average_cost_usd, i.average_cost_lbp, i.last_restocked_at
         FROM inventory i
         JOIN products p ON p.id = i.product_id
         WHERE p.is_active = TRUE
           AND i.is_reorder_alarm_enabled = TRUE
           AND i.quantity_on_hand <= i.reorder_point
         ORDER BY i.quantity_on_hand",
    )
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(rows.into_iter().map(InventorySummaryResponse::from).collect()))
}
