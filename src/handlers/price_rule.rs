use axum::http::StatusCode;
use axum::{extract::Path, extract::State, Extension, Json};
use rust_decimal_macros::dec;
use serde_json::json;
use tracing::instrument;

use crate::audit;
use crate::dtos::product::{CreatePriceRuleRequest, PriceRuleResponse};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::product::PriceRule;
use crate::state::AppState;

/// Creates a markdown rule. Overlapping active windows for the same product
/// are rejected outright so sale-time selection never has to disambiguate.
#[instrument(skip(state, auth, req))]
pub async fn create_price_rule(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreatePriceRuleRequest>,
) -> Result<(StatusCode, Json<PriceRuleResponse>), AppError> {
    auth.require_privileged()?;

    if req.discount_percent < dec!(0) || req.discount_percent > dec!(100) {
        return Err(AppError::validation("Discount must be between 0 and 100 percent"));
    }
    if let Some(ends_at) = req.ends_at {
        if ends_at <= req.starts_at {
            return Err(AppError::validation("End of window must be after its start"));
        }
    }

    let product_exists =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE id = $1")
            .bind(req.product_id)
            .fetch_one(&state.db_pool)
            .await?
            > 0;
    if !product_exists {
        return Err(AppError::not_found(format!("Product {} not found", req.product_id)));
    }

    if req.is_active {
        // Two rules overlap when each starts before the other ends; an open
        // end counts as unbounded.
        let overlapping = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM price_rules
             WHERE product_id = $1 AND is_active = TRUE
               AND starts_at < COALESCE($3, 'infinity'::timestamptz)
               AND COALESCE(ends_at, 'infinity'::timestamptz) > $2",
        )
        .bind(req.product_id)
        .bind(req.starts_at)
        .bind(req.ends_at)
        .fetch_one(&state.db_pool)
        .await?;
        if overlapping > 0 {
            return Err(AppError::conflict(
                "An active price rule already covers part of this window",
            ));
        }
    }

    let mut tx = state.db_pool.begin().await?;
    let rule = sqlx::query_as::<_, PriceRule>(
        "INSERT INTO price_rules (product_id, discount_percent, starts_at, ends_at, description, is_active)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id, product_id, discount_percent, starts_at, ends_at, description, is_active",
    )
    .bind(req.product_id)
    .bind(req.discount_percent)
    .bind(req.starts_at)
    .bind(req.ends_at)
    .bind(&req.description)
    .bind(req.is_active)
    .fetch_one(&mut *tx)
    .await?;

    audit::log(
        &mut tx,
        auth.user_id,
        "CreatePriceRule",
        "PriceRule",
        Some(rule.id),
        &json!({ "product_id": rule.product_id, "discount_percent": rule.discount_percent }),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(PriceRuleResponse::from(rule))))
}

#[instrument(skip(state))]
pub async fn list_price_rules(
    State(state): State<AppState>,
) -> Result<Json<Vec<PriceRuleResponse>>, AppError> {
    let rules = sqlx::query_as::<_, PriceRule>(
        "SELECT id, product_id, discount_percent, starts_at, ends_at, description, is_active
         FROM price_rules ORDER BY product_id, starts_at",
    )
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(rules.into_iter().map(PriceRuleResponse::from).collect()))
}

#[instrument(skip(state, auth))]
pub async fn delete_price_rule(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    auth.require_privileged()?;

    let mut tx = state.db_pool.begin().await?;
    let deleted = sqlx::query("DELETE FROM price_rules WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::not_found(format!("Price rule {id} not found")));
    }

    audit::log(&mut tx, auth.user_id, "DeletePriceRule", "PriceRule", Some(id), &json!({})).await?;
    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}
