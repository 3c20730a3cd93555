use axum::http::StatusCode;
use axum::{extract::State, Extension, Json};
use rust_decimal_macros::dec;
use serde_json::json;
use tracing::instrument;

use crate::audit;
use crate::currency;
use crate::dtos::currency::{CreateRateRequest, RateResponse};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::currency_rate::CurrencyRate;
use crate::state::AppState;

/// Appends a new rate; earlier rows are never edited, settled transactions
/// keep the rate they were settled at.
#[instrument(skip(state, auth, req))]
pub async fn create_rate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateRateRequest>,
) -> Result<(StatusCode, Json<RateResponse>), AppError> {
    auth.require_privileged()?;

    if req.rate <= dec!(0) {
        return Err(AppError::validation("Exchange rate must be greater than zero"));
    }

    let mut tx = state.db_pool.begin().await?;
    let rate = sqlx::query_as::<_, CurrencyRate>(
        "INSERT INTO currency_rates (rate, notes, entered_by)
         VALUES ($1, $2, $3)
         RETURNING *",
    )
    .bind(req.rate)
    .bind(&req.notes)
    .bind(auth.user_id)
    .fetch_one(&mut *tx)
    .await?;

    audit::log(
        &mut tx,
        auth.user_id,
        "SetExchangeRate",
        "CurrencyRate",
        Some(rate.id),
        &json!({ "rate": rate.rate }),
    )
    .await?;
    tx.commit().await?;

    state
        .event_hub
        .publish("currency.rate_changed", json!({ "rate": rate.rate }));

    Ok((StatusCode::CREATED, Json(RateResponse::from(rate))))
}

#[instrument(skip(state))]
pub async fn get_current_rate(
    State(state): State<AppState>,
) -> Result<Json<RateResponse>, AppError> {
    let rate = currency::current_rate(&state.db_pool).await?;
    Ok(Json(RateResponse::from(rate)))
}

#[instrument(skip(state, auth))]
pub async fn list_rates(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<RateResponse>>, AppError> {
    auth.require_privileged()?;

    let rates = sqlx::query_as::<_, CurrencyRate>(
        "SELECT * FROM currency_rates ORDER BY created_at DESC, id DESC LIMIT 100",
    )
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(rates.into_iter().map(RateResponse::from).collect()))
}
