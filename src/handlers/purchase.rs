use axum::http::StatusCode;
use axum::{extract::Path, extract::State, Extension, Json};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use crate::audit;
use crate::currency::{lbp_to_usd, round_lbp, round_usd, usd_to_lbp};
use crate::dtos::purchase::{CreatePurchaseRequest, PurchaseItemRequest, PurchaseLineResponse, PurchaseResponse};
use crate::error::{AppError, FieldErrors};
use crate::handlers::transaction::resolve_rate;
use crate::inventory;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

#[derive(sqlx::FromRow)]
struct PurchaseRow {
    id: i64,
    supplier_name: String,
    reference: Option<String>,
    exchange_rate_used: Decimal,
    total_cost_usd: Decimal,
    total_cost_lbp: Decimal,
    purchased_at: chrono::DateTime<Utc>,
}

/// Records a supplier delivery: every line feeds the moving-average cost
/// ledger, and products unknown to the catalog are created on the fly.
#[instrument(skip(state, auth, req))]
pub async fn create_purchase(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreatePurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseResponse>), AppError> {
    auth.require_privileged()?;

    if req.items.is_empty() {
        return Err(AppError::validation("At least one item is required"));
    }

    let rate = resolve_rate(&state.db_pool, req.exchange_rate).await?;
    let purchased_at = req.purchased_at.unwrap_or_else(Utc::now);
    let supplier_name = req
        .supplier_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("Walk-in Supplier")
        .to_string();

    let mut errors = FieldErrors::new();
    for (index, item) in req.items.iter().enumerate() {
        if item.quantity <= dec!(0) {
            errors
                .entry(format!("items[{index}].quantity"))
                .or_default()
                .push("Quantity must be greater than zero.".into());
        }
        if item.unit_cost < dec!(0) {
            errors
                .entry(format!("items[{index}].unit_cost"))
                .or_default()
                .push("Unit cost cannot be negative.".into());
        }
    }
    if !errors.is_empty() {
        return Err(AppError::validation_map(errors));
    }

    let mut tx = state.db_pool.begin().await?;

    let purchase = sqlx::query_as::<_, PurchaseRow>(
        "INSERT INTO purchase_orders (supplier_name, reference, exchange_rate_used, total_cost_usd, total_cost_lbp, created_by, purchased_at)
         VALUES ($1, $2, $3, 0, 0, $4, $5)
         RETURNING id, supplier_name, reference, exchange_rate_used, total_cost_usd, total_cost_lbp, purchased_at",
    )
    .bind(&supplier_name)
    .bind(&req.reference)
    .bind(rate)
    .bind(auth.user_id)
    .bind(purchased_at)
    .fetch_one(&mut *tx)
    .await?;

    let mut total_usd = dec!(0);
    let mut total_lbp = dec!(0);
    let mut lines = Vec::with_capacity(req.items.len());

    for (index, item) in req.items.iter().enumerate() {
        let (product_id, product_name) = resolve_product(&mut tx, item, rate).await.map_err(|err| {
            match err {
                AppError::ValidationError(msg) => {
                    let mut map = FieldErrors::new();
                    map.entry(format!("items[{index}]")).or_default().push(msg);
                    AppError::validation_map(map)
                }
                other => other,
            }
        })?;

        // Cost can be tendered in either currency; normalize both ways.
        let currency = item.currency.as_deref().unwrap_or("USD").to_ascii_uppercase();
        let (unit_cost_usd, unit_cost_lbp) = if currency == "LBP" {
            (lbp_to_usd(item.unit_cost, rate), round_lbp(item.unit_cost))
        } else {
            (round_usd(item.unit_cost), usd_to_lbp(item.unit_cost, rate))
        };

        let line_cost_usd = round_usd(unit_cost_usd * item.quantity);
        let line_cost_lbp = round_lbp(unit_cost_lbp * item.quantity);
        total_usd += line_cost_usd;
        total_lbp += line_cost_lbp;

        let line_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO purchase_order_lines
                 (purchase_order_id, product_id, quantity, unit_cost_usd, unit_cost_lbp, total_cost_usd, total_cost_lbp)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(purchase.id)
        .bind(product_id)
        .bind(item.quantity)
        .bind(unit_cost_usd)
        .bind(unit_cost_lbp)
        .bind(line_cost_usd)
        .bind(line_cost_lbp)
        .fetch_one(&mut *tx)
        .await?;

        inventory::receive_stock(&mut tx, product_id, item.quantity, unit_cost_usd, rate).await?;

        // Optionally reprice the product from this delivery.
        if let Some(sale_price) = item.sale_price_usd {
            if sale_price > dec!(0) {
                let price_usd = round_usd(sale_price);
                sqlx::query("UPDATE products SET price_usd = $2, price_lbp = $3 WHERE id = $1")
                    .bind(product_id)
                    .bind(price_usd)
                    .bind(usd_to_lbp(price_usd, rate))
                    .execute(&mut *tx)
                    .await?;
            }
        }

        lines.push(PurchaseLineResponse {
            id: line_id,
            product_id: Some(product_id),
            product_name: Some(product_name),
            quantity: item.quantity,
            unit_cost_usd,
            unit_cost_lbp,
            total_cost_usd: line_cost_usd,
            total_cost_lbp: line_cost_lbp,
        });
    }

    total_usd = round_usd(total_usd);
    total_lbp = round_lbp(total_lbp);
    sqlx::query("UPDATE purchase_orders SET total_cost_usd = $2, total_cost_lbp = $3 WHERE id = $1")
        .bind(purchase.id)
        .bind(total_usd)
        .bind(total_lbp)
        .execute(&mut *tx)
        .await?;

    audit::log(
        &mut tx,
        auth.user_id,
        "Purchase",
        "PurchaseOrder",
        Some(purchase.id),
        &json!({ "total_cost_usd": total_usd, "total_cost_lbp": total_lbp, "line_count": lines.len() }),
    )
    .await?;
    tx.commit().await?;

    state.event_hub.publish(
        "purchase.created",
        json!({ "id": purchase.id, "total_cost_usd": total_usd }),
    );

    Ok((
        StatusCode::CREATED,
        Json(PurchaseResponse {
            id: purchase.id,
            supplier_name,
            reference: purchase.reference,
            exchange_rate_used: rate,
            total_cost_usd: total_usd,
            total_cost_lbp: total_lbp,
            purchased_at,
            lines,
        }),
    ))
}

#[instrument(skip(state, auth))]
pub async fn list_purchases(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<PurchaseResponse>>, AppError> {
    auth.require_privileged()?;

    let purchases = sqlx::query_as::<_, PurchaseRow>(
        "SELECT id, supplier_name, reference, exchange_rate_used, total_cost_usd, total_cost_lbp, purchased_at
         FROM purchase_orders ORDER BY purchased_at DESC, id DESC LIMIT 100",
    )
    .fetch_all(&state.db_pool)
    .await?;

    let mut responses = Vec::with_capacity(purchases.len());
    for purchase in purchases {
        let lines = load_lines(&state.db_pool, purchase.id).await?;
        responses.push(to_response(purchase, lines));
    }
    Ok(Json(responses))
}

#[instrument(skip(state, auth))]
pub async fn get_purchase(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<PurchaseResponse>, AppError> {
    auth.require_privileged()?;

    let purchase = fetch_purchase(&state.db_pool, id).await?;
    let lines = load_lines(&state.db_pool, purchase.id).await?;
    Ok(Json(to_response(purchase, lines)))
}

/// Deleting a purchase reverses its inventory impact by receiving the
/// negated quantities at the original unit cost.
#[instrument(skip(state, auth))]
pub async fn delete_purchase(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    auth.require_privileged()?;

    let purchase = fetch_purchase(&state.db_pool, id).await?;
    let lines = load_lines(&state.db_pool, purchase.id).await?;

    let mut tx = state.db_pool.begin().await?;
    for line in &lines {
        if let Some(product_id) = line.product_id {
            inventory::receive_stock(
                &mut tx,
                product_id,
                -line.quantity,
                line.unit_cost_usd,
                purchase.exchange_rate_used,
            )
            .await?;
        }
    }

    sqlx::query("DELETE FROM purchase_order_lines WHERE purchase_order_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM purchase_orders WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    audit::log(
        &mut tx,
        auth.user_id,
        "DeletePurchase",
        "PurchaseOrder",
        Some(id),
        &json!({ "total_cost_usd": purchase.total_cost_usd, "line_count": lines.len() }),
    )
    .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// By id, else by barcode, else auto-created from the supplied name with a
/// default 25% markup over cost when no sale price is given.
async fn resolve_product(
    tx: &mut Transaction<'_, Postgres>,
    item: &PurchaseItemRequest,
    rate: Decimal,
) -> Result<(i64, String), AppError> {
    if let Some(id) = item.product_id {
        let row = sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
        if let Some(found) = row {
            return Ok(found);
        }
        return Err(AppError::not_found(format!("Product {id} not found")));
    }

    if let Some(barcode) = item.barcode.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
        let row = sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM products WHERE barcode = $1")
            .bind(barcode)
            .fetch_optional(&mut **tx)
            .await?;
        if let Some(found) = row {
            return Ok(found);
        }
    }

    let name = match item.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => return Err(AppError::validation("Product details were incomplete.".to_string())),
    };
    let barcode = item
        .barcode
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("AUTO-{}", Utc::now().format("%Y%m%d%H%M%S%3f")));

    let unit_cost_usd = if item.currency.as_deref().map(str::to_ascii_uppercase).as_deref() == Some("LBP") {
        lbp_to_usd(item.unit_cost, rate)
    } else {
        round_usd(item.unit_cost)
    };
    let price_usd = match item.sale_price_usd.filter(|p| *p > dec!(0)) {
        Some(price) => round_usd(price),
        None => round_usd(unit_cost_usd * dec!(1.25)).max(dec!(0.01)),
    };

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO products (name, barcode, sku, price_usd, price_lbp)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id",
    )
    .bind(&name)
    .bind(&barcode)
    .bind(&item.sku)
    .bind(price_usd)
    .bind(usd_to_lbp(price_usd, rate))
    .fetch_one(&mut **tx)
    .await?;

    Ok((id, name))
}

async fn fetch_purchase(db_pool: &PgPool, id: i64) -> Result<PurchaseRow, AppError> {
    sqlx::query_as::<_, PurchaseRow>(
        "SELECT id, supplier_name, reference, exchange_rate_used, total_cost_usd, total_cost_lbp, purchased_at
         FROM purchase_orders WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db_pool)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Purchase {id} not found")))
}

async fn load_lines(db_pool: &PgPool, purchase_id: i64) -> Result<Vec<PurchaseLineResponse>, AppError> {
    #[derive(sqlx::FromRow)]
    struct LineRow {
        id: i64,
        product_id: Option<i64>,
        product_name: Option<String>,
        quantity: Decimal,
        unit_cost_usd: Decimal,
        unit_cost_lbp: Decimal,
        total_cost_usd: Decimal,
        total_cost_lbp: Decimal,
    }

    let rows = sqlx::query_as::<_, LineRow>(
        "SELECT l.id, l.product_id, p.name AS product_name, l.quantity,
                l.unit_cost_usd, l.unit_cost_lbp, l.total_cost_usd, l.total_cost_lbp
         FROM purchase_order_lines l
         LEFT JOIN products p ON p.id = l.product_id
         WHERE l.purchase_order_id = $1
         ORDER BY l.id",
    )
    .bind(purchase_id)
    .fetch_all(db_pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| PurchaseLineResponse {
            id: r.id,
            product_id: r.product_id,
            product_name: r.product_name,
            quantity: r.quantity,
            unit_cost_usd: r.unit_cost_usd,
            unit_cost_lbp: r.unit_cost_lbp,
            total_cost_usd: r.total_cost_usd,
            total_cost_lbp: r.total_cost_lbp,
        })
        .collect())
}

fn to_response(purchase: PurchaseRow, lines: Vec<PurchaseLineResponse>) -> PurchaseResponse {
    PurchaseResponse {
        id: purchase.id,
        supplier_name: purchase.supplier_name,
        reference: purchase.reference,
        exchange_rate_used: purchase.exchange_rate_used,
        total_cost_usd: purchase.total_cost_usd,
        total_cost_lbp: purchase.total_cost_lbp,
        purchased_at: purchase.purchased_at,
        lines,
    }
}
