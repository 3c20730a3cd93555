use axum::http::StatusCode;
use axum::{extract::Path, extract::State, Extension, Json};
use rust_decimal_macros::dec;
use serde_json::json;
use sqlx::PgPool;
use tracing::instrument;

use crate::audit;
use crate::currency::{self, lbp_to_usd, round_lbp, round_usd, usd_to_lbp};
use crate::dtos::offer::{CreateOfferRequest, OfferItemResponse, OfferResponse};
use crate::error::{AppError, FieldErrors};
use crate::middleware::auth::AuthContext;
use crate::models::offer::Offer;
use crate::state::AppState;

/// Field-level validation of an offer definition. Duplicate products,
/// non-positive quantities and unknown products are all collected into one
/// error map rather than failing on the first problem.
async fn validate(db_pool: &PgPool, req: &CreateOfferRequest) -> Result<(), AppError> {
    let mut errors = FieldErrors::new();

    if req.name.trim().is_empty() {
        errors.entry("name".into()).or_default().push("Name is required.".into());
    }
    if req.price < dec!(0) {
        errors.entry("price".into()).or_default().push("Price cannot be negative.".into());
    }
    if parse_currency(&req.currency).is_none() {
        errors
            .entry("currency".into())
            .or_default()
            .push("Currency must be USD or LBP.".into());
    }
    if req.items.is_empty() {
        errors.entry("items".into()).or_default().push("At least one item is required.".into());
    }

    let mut seen = Vec::new();
    for item in &req.items {
        if seen.contains(&item.product_id) {
            errors
                .entry("items".into())
                .or_default()
                .push("Duplicate products are not allowed in an offer.".into());
        }
        seen.push(item.product_id);
        if item.quantity <= dec!(0) {
            errors
                .entry("items".into())
                .or_default()
                .push(format!("Quantity for product {} must be greater than zero.", item.product_id));
        }
    }

    if errors.is_empty() && !seen.is_empty() {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE id = ANY($1) AND is_active = TRUE",
        )
        .bind(&seen)
        .fetch_one(db_pool)
        .await?;
        if found as usize != seen.len() {
            errors
                .entry("items".into())
                .or_default()
                .push("One or more products could not be found.".into());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation_map(errors))
    }
}

fn parse_currency(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "USD" => Some("USD"),
        "LBP" => Some("LBP"),
        _ => None,
    }
}

/// Dry-run validation for the offer editor; never writes.
#[instrument(skip(state, auth, req))]
pub async fn validate_offer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateOfferRequest>,
) -> Result<StatusCode, AppError> {
    auth.require_privileged()?;
    validate(&state.db_pool, &req).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, auth, req))]
pub async fn create_offer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateOfferRequest>,
) -> Result<(StatusCode, Json<OfferResponse>), AppError> {
    auth.require_privileged()?;
    validate(&state.db_pool, &req).await?;

    // Both currency prices are fixed at definition time.
    let rate = currency::current_rate(&state.db_pool).await?.rate;
    let (price_usd, price_lbp) = match parse_currency(&req.currency) {
        Some("LBP") => (lbp_to_usd(req.price, rate), round_lbp(req.price)),
        _ => (round_usd(req.price), usd_to_lbp(req.price, rate)),
    };

    let mut tx = state.db_pool.begin().await?;
    let offer = sqlx::query_as::<_, Offer>(
        "INSERT INTO offers (name, description, price_usd, price_lbp, is_active)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(req.name.trim())
    .bind(&req.description)
    .bind(price_usd)
    .bind(price_lbp)
    .bind(req.is_active)
    .fetch_one(&mut *tx)
    .await?;

    for item in &req.items {
        sqlx::query("INSERT INTO offer_items (offer_id, product_id, quantity) VALUES ($1, $2, $3)")
            .bind(offer.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
    }

    audit::log(
        &mut tx,
        auth.user_id,
        "CreateOffer",
        "Offer",
        Some(offer.id),
        &json!({ "name": offer.name, "price_usd": offer.price_usd, "items": req.items.len() }),
    )
    .await?;
    tx.commit().await?;

    let response = load_offer(&state.db_pool, offer.id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state))]
pub async fn list_offers(
    State(state): State<AppState>,
) -> Result<Json<Vec<OfferResponse>>, AppError> {
    let offers = sqlx::query_as::<_, Offer>("SELECT * FROM offers ORDER BY name")
        .fetch_all(&state.db_pool)
        .await?;

    let mut responses = Vec::with_capacity(offers.len());
    for offer in offers {
        let items = load_items(&state.db_pool, offer.id).await?;
        responses.push(OfferResponse::from_parts(offer, items));
    }
    Ok(Json(responses))
}

#[instrument(skip(state))]
pub async fn get_offer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OfferResponse>, AppError> {
    let response = load_offer(&state.db_pool, id).await?;
    Ok(Json(response))
}

#[instrument(skip(state, auth))]
pub async fn delete_offer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    auth.require_privileged()?;

    let mut tx = state.db_pool.begin().await?;
    let deleted = sqlx::query("DELETE FROM offers WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::not_found(format!("Offer {id} not found")));
    }

    audit::log(&mut tx, auth.user_id, "DeleteOffer", "Offer", Some(id), &json!({})).await?;
    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn load_offer(db_pool: &PgPool, id: i64) -> Result<OfferResponse, AppError> {
    let offer = sqlx::query_as::<_, Offer>("SELECT * FROM offers WHERE id = $1")
        .bind(id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Offer {id} not found")))?;
    let items = load_items(db_pool, offer.id).await?;
    Ok(OfferResponse::from_parts(offer, items))
}

async fn load_items(db_pool: &PgPool, offer_id: i64) -> Result<Vec<OfferItemResponse>, AppError> {
    let rows = sqlx::query_as::<_, (i64, Option<String>, rust_decimal::Decimal)>(
        "SELECT oi.product_id, p.name, oi.quantity
         FROM offer_items oi
         LEFT JOIN products p ON p.id = oi.product_id
         WHERE oi.offer_id = $1
         ORDER BY oi.id",
    )
    .bind(offer_id)
    .fetch_all(db_pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(product_id, product_name, quantity)| OfferItemResponse {
            product_id,
            product_name,
            quantity,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_accepts_usd_and_lbp_case_insensitively() {
        assert_eq!(parse_currency("USD"), Some("USD"));
        assert_eq!(parse_currency("usd"), Some("USD"));
        assert_eq!(parse_currency(" lbp "), Some("LBP"));
    }

    #[test]
    fn currency_rejects_anything_else() {
        assert_eq!(parse_currency("EUR"), None);
        assert_eq!(parse_currency(""), None);
    }
}
