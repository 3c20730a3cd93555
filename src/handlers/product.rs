use axum::http::StatusCode;
use axum::{extract::Path, extract::State, Extension, Json};
use serde_json::json;
use tracing::instrument;

use crate::audit;
use crate::currency::{self, round_lbp, round_usd, usd_to_lbp};
use crate::dtos::product::{CreateProductRequest, ProductResponse};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::product::Product;
use crate::state::AppState;

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE is_active = TRUE ORDER BY is_pinned DESC, name",
    )
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_product_by_barcode(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE barcode = $1 AND is_active = TRUE",
    )
    .bind(barcode.trim())
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found(format!("No product with barcode {barcode}")))?;

    Ok(Json(ProductResponse::from(product)))
}

#[instrument(skip(state, auth, req))]
pub async fn create_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    auth.require_privileged()?;

    if req.name.trim().is_empty() {
        return Err(AppError::validation("Name is required"));
    }
    if req.barcode.trim().is_empty() {
        return Err(AppError::validation("Barcode is required"));
    }
    if req.price_usd < rust_decimal::Decimal::ZERO {
        return Err(AppError::validation("Price cannot be negative"));
    }

    let price_usd = round_usd(req.price_usd);
    let price_lbp = match req.price_lbp {
        Some(lbp) => round_lbp(lbp),
        None => {
            let rate = currency::current_rate(&state.db_pool).await?.rate;
            usd_to_lbp(price_usd, rate)
        }
    };

    let mut tx = state.db_pool.begin().await?;
    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (name, barcode, sku, category_id, price_usd, price_lbp, is_pinned)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING *",
    )
    .bind(req.name.trim())
    .bind(req.barcode.trim())
    .bind(&req.sku)
    .bind(req.category_id)
    .bind(price_usd)
    .bind(price_lbp)
    .bind(req.is_pinned)
    .fetch_one(&mut *tx)
    .await
    .map_err(|err| match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::conflict("A product with this barcode or SKU already exists")
        }
        _ => AppError::from(err),
    })?;

    audit::log(
        &mut tx,
        auth.user_id,
        "CreateProduct",
        "Product",
        Some(product.id),
        &json!({ "name": product.name, "barcode": product.barcode, "price_usd": product.price_usd }),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}
