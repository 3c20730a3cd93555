use std::collections::HashMap;

use axum::http::StatusCode;
use axum::{extract::Path, extract::State, Extension, Json};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};

use crate::audit;
use crate::currency::{self, compute_balance, round_lbp, round_usd};
use tracing::instrument;

use crate::dtos::transaction::{
    BalanceResponse, CartItemRequest, CheckoutRequest, CheckoutResponse, ComputeBalanceRequest,
    ReceiptResponse, ReturnRequest, TransactionLineResponse, TransactionResponse,
    UpdateTransactionRequest,
};
use crate::error::AppError;
use crate::inventory;
use crate::middleware::auth::AuthContext;
use crate::models::product::PriceRule;
use crate::models::transaction::{PosTransaction, TransactionLine, TransactionType};
use crate::pricing::{self, CartInputs, OfferSnapshot, PricedLine, PricingContext, ProductSnapshot};
use crate::receipt;
use crate::state::AppState;

#[instrument(skip(state, auth, req))]
pub async fn checkout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    check_capabilities(&auth, &req.items, req.manual_total_usd.is_some() || req.manual_total_lbp.is_some(), req.save_to_my_cart)?;
    check_self_purchase_totals(req.save_to_my_cart, req.manual_total_usd, req.manual_total_lbp)?;

    let rate = resolve_rate(&state.db_pool, req.exchange_rate).await?;
    let inputs = load_cart_inputs(&state.db_pool, &req.items).await?;
    let ctx = PricingContext {
        rate,
        now: Utc::now(),
        allow_manual_pricing: auth.is_privileged(),
        price_at_cost_only: req.save_to_my_cart,
    };
    let cart = pricing::price_cart(&req.items, &inputs.cart(), &ctx)?;

    let (total_usd, has_manual_total) = match req.manual_total_usd {
        Some(total) => (round_usd(total), true),
        None => (cart.total_usd, req.manual_total_lbp.is_some()),
    };
    // With a manual USD total and no manual LBP total, the LBP side is
    // re-derived from the override; otherwise the line-summed total stands.
    let total_lbp_override = match (req.manual_total_lbp, req.manual_total_usd) {
        (Some(lbp), _) => Some(lbp),
        (None, Some(_)) => None,
        (None, None) => Some(cart.total_lbp),
    };
    let balance = compute_balance(total_usd, req.paid_usd, req.paid_lbp, rate, total_lbp_override);

    // Anomaly gate: priced but not yet persisted. A flagged cart is handed
    // back for explicit confirmation instead of being written.
    if !req.confirm_override {
        if let Some(reason) = run_anomaly_gate(&state, &cart.lines).await {
            return Ok((
                StatusCode::OK,
                Json(CheckoutResponse {
                    transaction_id: None,
                    transaction_number: None,
                    total_usd: balance.total_usd,
                    total_lbp: balance.total_lbp,
                    balance_usd: balance.balance_usd,
                    balance_lbp: balance.balance_lbp,
                    lines: cart.lines.iter().map(TransactionLineResponse::from).collect(),
                    requires_override: true,
                    override_reason: Some(reason),
                    receipt_base64: String::new(),
                }),
            ));
        }
    }

    let mut tx = state.db_pool.begin().await?;
    let number = transaction_number(TransactionType::Sale);
    let transaction = insert_transaction(
        &mut tx,
        &number,
        TransactionType::Sale,
        auth.user_id,
        rate,
        balance.total_usd,
        balance.total_lbp,
        req.paid_usd,
        req.paid_lbp,
        balance.balance_usd,
        balance.balance_lbp,
        has_manual_total,
    )
    .await?;
    let lines = insert_lines(&mut tx, transaction.id, &cart.lines).await?;

    for line in &lines {
        if let Some(product_id) = line.product_id {
            inventory::consume(&mut tx, product_id, line.quantity).await?;
        }
    }

    if req.save_to_my_cart {
        sqlx::query(
            "INSERT INTO personal_purchases (transaction_id, user_id, total_usd, total_lbp, purchase_date)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(transaction.id)
        .bind(auth.user_id)
        .bind(transaction.total_usd)
        .bind(transaction.total_lbp)
        .bind(transaction.created_at)
        .execute(&mut *tx)
        .await?;
    }

    audit::log(
        &mut tx,
        auth.user_id,
        "Checkout",
        "PosTransaction",
        Some(transaction.id),
        &json!({
            "transaction_number": transaction.transaction_number,
            "total_usd": transaction.total_usd,
            "total_lbp": transaction.total_lbp,
            "line_count": lines.len(),
            "confirm_override": req.confirm_override,
        }),
    )
    .await?;
    tx.commit().await?;

    let names: HashMap<i64, String> = inputs
        .products
        .values()
        .map(|p| (p.id, p.name.clone()))
        .collect();
    let receipt_base64 = receipt::render_base64(&transaction, &name_lines(&lines, &names), rate);

    state.event_hub.publish(
        "transaction.created",
        json!({
            "id": transaction.id,
            "transaction_number": transaction.transaction_number,
            "transaction_type": transaction.transaction_type,
            "total_usd": transaction.total_usd,
        }),
    );

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            transaction_id: Some(transaction.id),
            transaction_number: Some(transaction.transaction_number.clone()),
            total_usd: transaction.total_usd,
            total_lbp: transaction.total_lbp,
            balance_usd: transaction.balance_usd,
            balance_lbp: transaction.balance_lbp,
            lines: lines.into_iter().map(TransactionLineResponse::from).collect(),
            requires_override: false,
            override_reason: None,
            receipt_base64,
        }),
    ))
}

/// Full replacement of an already-settled transaction: the old lines'
/// inventory impact is reversed, the new line set is priced from scratch at
/// the frozen rate, and the line collection is swapped atomically.
#[instrument(skip(state, auth, req))]
pub async fn update_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTransactionRequest>,
) -> Result<Json<TransactionResponse>, AppError> {
    auth.require_privileged()?;
    check_self_purchase_totals(req.save_to_my_cart, req.manual_total_usd, req.manual_total_lbp)?;

    let existing = fetch_transaction(&state.db_pool, id).await?;
    if existing.transaction_type == TransactionType::Return.as_str() {
        return Err(AppError::validation("Return transactions cannot be edited"));
    }

    let rate = existing.exchange_rate_used;
    let inputs = load_cart_inputs(&state.db_pool, &req.items).await?;
    let ctx = PricingContext {
        rate,
        now: Utc::now(),
        allow_manual_pricing: true,
        price_at_cost_only: req.save_to_my_cart,
    };
    let cart = pricing::price_cart(&req.items, &inputs.cart(), &ctx)?;

    let (total_usd, has_manual_total) = match req.manual_total_usd {
        Some(total) => (round_usd(total), true),
        None => (cart.total_usd, req.manual_total_lbp.is_some()),
    };
    let total_lbp_override = match (req.manual_total_lbp, req.manual_total_usd) {
        (Some(lbp), _) => Some(lbp),
        (None, Some(_)) => None,
        (None, None) => Some(cart.total_lbp),
    };
    let balance = compute_balance(total_usd, req.paid_usd, req.paid_lbp, rate, total_lbp_override);

    let mut tx = state.db_pool.begin().await?;

    let old_lines = fetch_lines_for_update(&mut tx, id).await?;
    for line in &old_lines {
        if let Some(product_id) = line.product_id {
            inventory::restore(&mut tx, product_id, line.quantity).await?;
        }
    }
    sqlx::query("DELETE FROM transaction_lines WHERE transaction_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let lines = insert_lines(&mut tx, id, &cart.lines).await?;
    for line in &lines {
        if let Some(product_id) = line.product_id {
            inventory::consume(&mut tx, product_id, line.quantity).await?;
        }
    }

    let updated = sqlx::query_as::<_, PosTransaction>(
        "UPDATE transactions
         SET total_usd = $2, total_lbp = $3, paid_usd = $4, paid_lbp = $5,
             balance_usd = $6, balance_lbp = $7, has_manual_total_override = $8,
             updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(balance.total_usd)
    .bind(balance.total_lbp)
    .bind(req.paid_usd)
    .bind(req.paid_lbp)
    .bind(balance.balance_usd)
    .bind(balance.balance_lbp)
    .bind(has_manual_total)
    .fetch_one(&mut *tx)
    .await?;

    // Keep the linked self-purchase record in step with the flag.
    let had_personal =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM personal_purchases WHERE transaction_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?
            > 0;
    if req.save_to_my_cart {
        if had_personal {
            sqlx::query(
                "UPDATE personal_purchases SET total_usd = $2, total_lbp = $3 WHERE transaction_id = $1",
            )
            .bind(id)
            .bind(updated.total_usd)
            .bind(updated.total_lbp)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                "INSERT INTO personal_purchases (transaction_id, user_id, total_usd, total_lbp, purchase_date)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(id)
            .bind(auth.user_id)
            .bind(updated.total_usd)
            .bind(updated.total_lbp)
            .bind(updated.created_at)
            .execute(&mut *tx)
            .await?;
        }
    } else if had_personal {
        sqlx::query("DELETE FROM personal_purchases WHERE transaction_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    audit::log(
        &mut tx,
        auth.user_id,
        "UpdateTransaction",
        "PosTransaction",
        Some(id),
        &json!({
            "total_usd": updated.total_usd,
            "total_lbp": updated.total_lbp,
            "line_count": lines.len(),
        }),
    )
    .await?;
    tx.commit().await?;

    state.event_hub.publish(
        "transaction.updated",
        json!({ "id": updated.id, "total_usd": updated.total_usd }),
    );

    Ok(Json(TransactionResponse::from_parts(updated, lines)))
}

/// A return is a brand-new transaction mirroring lines of the original;
/// the original row is never mutated.
#[instrument(skip(state, auth, req))]
pub async fn create_return(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ReturnRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let original = fetch_transaction(&state.db_pool, req.transaction_id).await?;
    let original_lines = sqlx::query_as::<_, TransactionLine>(
        "SELECT * FROM transaction_lines WHERE transaction_id = $1 ORDER BY id",
    )
    .bind(original.id)
    .fetch_all(&state.db_pool)
    .await?;

    let selected: Vec<&TransactionLine> = match &req.line_ids {
        Some(ids) => {
            let mut picked = Vec::with_capacity(ids.len());
            for line_id in ids {
                let line = original_lines
                    .iter()
                    .find(|l| l.id == *line_id)
                    .ok_or_else(|| {
                        AppError::not_found(format!(
                            "Line {line_id} does not belong to transaction {}",
                            original.id
                        ))
                    })?;
                if line.is_waste {
                    return Err(AppError::validation("Waste lines cannot be returned"));
                }
                picked.push(line);
            }
            picked
        }
        None => original_lines.iter().filter(|l| !l.is_waste).collect(),
    };
    if selected.is_empty() {
        return Err(AppError::validation("Nothing to return"));
    }

    let mirrored: Vec<PricedLine> = selected.iter().map(|l| pricing::mirror_line(l)).collect();
    let total_usd = round_usd(mirrored.iter().map(|l| l.total_usd).sum());
    let total_lbp = round_lbp(mirrored.iter().map(|l| l.total_lbp).sum());
    let rate = original.exchange_rate_used;

    let mut tx = state.db_pool.begin().await?;
    let number = transaction_number(TransactionType::Return);
    // paid = total so the return settles to a zero balance.
    let transaction = insert_transaction(
        &mut tx,
        &number,
        TransactionType::Return,
        auth.user_id,
        rate,
        total_usd,
        total_lbp,
        total_usd,
        total_lbp,
        dec!(0),
        dec!(0),
        false,
    )
    .await?;
    let lines = insert_lines(&mut tx, transaction.id, &mirrored).await?;

    // Negative quantities: consume adds the stock back.
    for line in &lines {
        if let Some(product_id) = line.product_id {
            inventory::consume(&mut tx, product_id, line.quantity).await?;
        }
    }

    audit::log(
        &mut tx,
        auth.user_id,
        "Return",
        "PosTransaction",
        Some(transaction.id),
        &json!({
            "original_transaction_id": original.id,
            "transaction_number": transaction.transaction_number,
            "total_usd": transaction.total_usd,
        }),
    )
    .await?;
    tx.commit().await?;

    state.event_hub.publish(
        "transaction.returned",
        json!({
            "id": transaction.id,
            "original_transaction_id": original.id,
            "total_usd": transaction.total_usd,
        }),
    );

    Ok((
        StatusCode::CREATED,
        Json(TransactionResponse::from_parts(transaction, lines)),
    ))
}

/// Live balance preview for the cashier screen. No side effects.
#[instrument(skip(state, req))]
pub async fn compute_balance_preview(
    State(state): State<AppState>,
    Json(req): Json<ComputeBalanceRequest>,
) -> Result<Json<BalanceResponse>, AppError> {
    let rate = resolve_rate(&state.db_pool, req.exchange_rate).await?;
    let balance = compute_balance(req.total_usd, req.paid_usd, req.paid_lbp, rate, req.total_lbp);
    Ok(Json(BalanceResponse::from(balance)))
}

#[instrument(skip(state, auth))]
pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    auth.require_privileged()?;

    let transactions = sqlx::query_as::<_, PosTransaction>(
        "SELECT * FROM transactions ORDER BY created_at DESC, id DESC LIMIT 100",
    )
    .fetch_all(&state.db_pool)
    .await?;

    let mut responses = Vec::with_capacity(transactions.len());
    for transaction in transactions {
        let lines = sqlx::query_as::<_, TransactionLine>(
            "SELECT * FROM transaction_lines WHERE transaction_id = $1 ORDER BY id",
        )
        .bind(transaction.id)
        .fetch_all(&state.db_pool)
        .await?;
        responses.push(TransactionResponse::from_parts(transaction, lines));
    }

    Ok(Json(responses))
}

#[instrument(skip(state, auth))]
pub async fn get_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<TransactionResponse>, AppError> {
    auth.require_privileged()?;

    let transaction = fetch_transaction(&state.db_pool, id).await?;
    let lines = sqlx::query_as::<_, TransactionLine>(
        "SELECT * FROM transaction_lines WHERE transaction_id = $1 ORDER BY id",
    )
    .bind(transaction.id)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(TransactionResponse::from_parts(transaction, lines)))
}

/// Re-renders the receipt of a settled transaction, for reprints.
#[instrument(skip(state))]
pub async fn get_transaction_receipt(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ReceiptResponse>, AppError> {
    let transaction = fetch_transaction(&state.db_pool, id).await?;
    let lines = sqlx::query_as::<_, TransactionLine>(
        "SELECT * FROM transaction_lines WHERE transaction_id = $1 ORDER BY id",
    )
    .bind(transaction.id)
    .fetch_all(&state.db_pool)
    .await?;

    let product_ids: Vec<i64> = lines.iter().filter_map(|l| l.product_id).collect();
    let mut names = HashMap::new();
    if !product_ids.is_empty() {
        let rows = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, name FROM products WHERE id = ANY($1)",
        )
        .bind(&product_ids)
        .fetch_all(&state.db_pool)
        .await?;
        names.extend(rows);
    }

    let receipt_base64 = receipt::render_base64(
        &transaction,
        &name_lines(&lines, &names),
        transaction.exchange_rate_used,
    );

    Ok(Json(ReceiptResponse {
        transaction_id: transaction.id,
        transaction_number: transaction.transaction_number,
        receipt_base64,
    }))
}

// ---------------------------------------------------------------------------

pub(crate) struct LoadedInputs {
    pub products: HashMap<i64, ProductSnapshot>,
    pub rules_by_product: HashMap<i64, Vec<PriceRule>>,
    pub offers: HashMap<i64, OfferSnapshot>,
}

impl LoadedInputs {
    pub fn cart(&self) -> CartInputs<'_> {
        CartInputs {
            products: &self.products,
            rules_by_product: &self.rules_by_product,
            offers: &self.offers,
        }
    }
}

pub(crate) async fn resolve_rate(db_pool: &PgPool, requested: Decimal) -> Result<Decimal, AppError> {
    if requested > dec!(0) {
        Ok(requested)
    } else {
        Ok(currency::current_rate(db_pool).await?.rate)
    }
}

fn check_capabilities(
    auth: &AuthContext,
    items: &[CartItemRequest],
    has_manual_total: bool,
    save_to_my_cart: bool,
) -> Result<(), AppError> {
    if auth.is_privileged() {
        return Ok(());
    }
    if items.iter().any(|i| i.is_waste) {
        return Err(AppError::forbidden("Waste lines require the admin role"));
    }
    if items.iter().any(|i| i.has_manual_price()) || has_manual_total {
        return Err(AppError::forbidden("Manual pricing requires the admin role"));
    }
    if save_to_my_cart {
        return Err(AppError::forbidden("Self-purchase carts require the admin role"));
    }
    Ok(())
}

/// Self-purchase carts are priced at inventory cost; a manual total on top
/// would reintroduce a margin, so the combination is rejected outright.
fn check_self_purchase_totals(
    save_to_my_cart: bool,
    manual_total_usd: Option<Decimal>,
    manual_total_lbp: Option<Decimal>,
) -> Result<(), AppError> {
    if save_to_my_cart && (manual_total_usd.is_some() || manual_total_lbp.is_some()) {
        return Err(AppError::validation(
            "A manual total cannot be combined with a self-purchase cart",
        ));
    }
    Ok(())
}

fn name_lines(
    lines: &[TransactionLine],
    names: &HashMap<i64, String>,
) -> Vec<(TransactionLine, Option<String>)> {
    lines
        .iter()
        .map(|line| {
            let name = line.product_id.and_then(|id| names.get(&id).cloned());
            (line.clone(), name)
        })
        .collect()
}

/// One read pass per cart: products (with their inventory cost), the active
/// price rules for those products, and any referenced offers with their
/// component products.
pub(crate) async fn load_cart_inputs(
    db_pool: &PgPool,
    items: &[CartItemRequest],
) -> Result<LoadedInputs, AppError> {
    let mut offers = HashMap::new();
    let mut product_ids: Vec<i64> = items.iter().filter_map(|i| i.product_id).collect();

    let offer_ids: Vec<i64> = items.iter().filter_map(|i| i.offer_id).collect();
    if !offer_ids.is_empty() {
        let rows = sqlx::query_as::<_, (i64, String, Decimal, Decimal, bool)>(
            "SELECT id, name, price_usd, price_lbp, is_active FROM offers WHERE id = ANY($1)",
        )
        .bind(&offer_ids)
        .fetch_all(db_pool)
        .await?;
        for (id, name, price_usd, price_lbp, is_active) in rows {
            let components = sqlx::query_as::<_, (i64, Decimal)>(
                "SELECT product_id, quantity FROM offer_items WHERE offer_id = $1 ORDER BY id",
            )
            .bind(id)
            .fetch_all(db_pool)
            .await?;
            product_ids.extend(components.iter().map(|(pid, _)| *pid));
            offers.insert(
                id,
                OfferSnapshot { id, name, price_usd, price_lbp, is_active, components },
            );
        }
    }

    product_ids.sort_unstable();
    product_ids.dedup();

    let mut products = HashMap::new();
    if !product_ids.is_empty() {
        let rows = sqlx::query_as::<_, (i64, String, Decimal, Decimal, Option<Decimal>)>(
            "SELECT p.id, p.name, p.price_usd, p.price_lbp, i.average_cost_usd
             FROM products p
             LEFT JOIN inventory i ON i.product_id = p.id
             WHERE p.id = ANY($1)",
        )
        .bind(&product_ids)
        .fetch_all(db_pool)
        .await?;
        for (id, name, price_usd, price_lbp, average_cost_usd) in rows {
            products.insert(
                id,
                ProductSnapshot { id, name, price_usd, price_lbp, average_cost_usd },
            );
        }
    }

    let mut rules_by_product: HashMap<i64, Vec<PriceRule>> = HashMap::new();
    if !product_ids.is_empty() {
        let rules = sqlx::query_as::<_, PriceRule>(
            "SELECT id, product_id, discount_percent, starts_at, ends_at, description, is_active
             FROM price_rules WHERE product_id = ANY($1) AND is_active = TRUE",
        )
        .bind(&product_ids)
        .fetch_all(db_pool)
        .await?;
        for rule in rules {
            rules_by_product.entry(rule.product_id).or_default().push(rule);
        }
    }

    Ok(LoadedInputs { products, rules_by_product, offers })
}

/// Sends each priced line through the vision classifier; the first flagged
/// line holds the whole cart. Classifier outages fail open inside MlClient.
async fn run_anomaly_gate(state: &AppState, lines: &[PricedLine]) -> Option<String> {
    if !state.ml_client.is_enabled() {
        return None;
    }
    for line in lines {
        if line.is_waste {
            continue;
        }
        let Some(product_id) = line.product_id else {
            continue;
        };
        if let Some(result) = state
            .ml_client
            .predict_vision(product_id, line.unit_price_usd, line.quantity)
            .await
        {
            if result.is_flagged() {
                return Some(result.flag_reason());
            }
        }
    }
    None
}

fn transaction_number(kind: TransactionType) -> String {
    let prefix = match kind {
        TransactionType::Sale => "TX",
        TransactionType::Return => "RT",
    };
    format!("{prefix}-{}", Utc::now().format("%Y%m%d%H%M%S%3f"))
}

#[allow(clippy::too_many_arguments)]
async fn insert_transaction(
    tx: &mut Transaction<'_, Postgres>,
    number: &str,
    kind: TransactionType,
    user_id: i64,
    rate: Decimal,
    total_usd: Decimal,
    total_lbp: Decimal,
    paid_usd: Decimal,
    paid_lbp: Decimal,
    balance_usd: Decimal,
    balance_lbp: Decimal,
    has_manual_total_override: bool,
) -> Result<PosTransaction, AppError> {
    let row = sqlx::query_as::<_, PosTransaction>(
        "INSERT INTO transactions
             (transaction_number, transaction_type, user_id, exchange_rate_used,
              total_usd, total_lbp, paid_usd, paid_lbp, balance_usd, balance_lbp,
              has_manual_total_override)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         RETURNING *",
    )
    .bind(number)
    .bind(kind.as_str())
    .bind(user_id)
    .bind(rate)
    .bind(total_usd)
    .bind(total_lbp)
    .bind(paid_usd)
    .bind(paid_lbp)
    .bind(balance_usd)
    .bind(balance_lbp)
    .bind(has_manual_total_override)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

async fn insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    transaction_id: i64,
    lines: &[PricedLine],
) -> Result<Vec<TransactionLine>, AppError> {
    let mut inserted = Vec::with_capacity(lines.len());
    for line in lines {
        let row = sqlx::query_as::<_, TransactionLine>(
            "INSERT INTO transaction_lines
                 (transaction_id, product_id, price_rule_id, offer_id, quantity,
                  base_unit_price_usd, base_unit_price_lbp, unit_price_usd, unit_price_lbp,
                  discount_percent, total_usd, total_lbp, cost_usd, cost_lbp,
                  profit_usd, profit_lbp, is_waste, has_manual_price_override)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
             RETURNING *",
        )
        .bind(transaction_id)
        .bind(line.product_id)
        .bind(line.price_rule_id)
        .bind(line.offer_id)
        .bind(line.quantity)
        .bind(line.base_unit_price_usd)
        .bind(line.base_unit_price_lbp)
        .bind(line.unit_price_usd)
        .bind(line.unit_price_lbp)
        .bind(line.discount_percent)
        .bind(line.total_usd)
        .bind(line.total_lbp)
        .bind(line.cost_usd)
        .bind(line.cost_lbp)
        .bind(line.profit_usd)
        .bind(line.profit_lbp)
        .bind(line.is_waste)
        .bind(line.has_manual_price_override)
        .fetch_one(&mut **tx)
        .await?;
        inserted.push(row);
    }
    Ok(inserted)
}

async fn fetch_transaction(db_pool: &PgPool, id: i64) -> Result<PosTransaction, AppError> {
    sqlx::query_as::<_, PosTransaction>("SELECT * FROM transactions WHERE id = $1")
        .bind(id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Transaction {id} not found")))
}

async fn fetch_lines_for_update(
    tx: &mut Transaction<'_, Postgres>,
    transaction_id: i64,
) -> Result<Vec<TransactionLine>, AppError> {
    let lines = sqlx::query_as::<_, TransactionLine>(
        "SELECT * FROM transaction_lines WHERE transaction_id = $1 ORDER BY id FOR UPDATE",
    )
    .bind(transaction_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn self_purchase_carts_reject_manual_totals() {
        assert!(check_self_purchase_totals(true, Some(dec!(25.00)), None).is_err());
        assert!(check_self_purchase_totals(true, None, Some(dec!(2250000))).is_err());
        assert!(check_self_purchase_totals(true, Some(dec!(25.00)), Some(dec!(2250000))).is_err());
    }

    #[test]
    fn manual_totals_allowed_outside_self_purchase() {
        assert!(check_self_purchase_totals(false, Some(dec!(25.00)), Some(dec!(2250000))).is_ok());
        assert!(check_self_purchase_totals(true, None, None).is_ok());
    }

    #[test]
    fn line_naming_falls_back_for_deleted_products() {
        let mut line = TransactionLine {
            id: 1,
            transaction_id: 1,
            product_id: Some(7),
            price_rule_id: None,
            offer_id: None,
            quantity: dec!(1),
            base_unit_price_usd: dec!(10.00),
            base_unit_price_lbp: dec!(900000),
            unit_price_usd: dec!(10.00),
            unit_price_lbp: dec!(900000),
            discount_percent: dec!(0),
            total_usd: dec!(10.00),
            total_lbp: dec!(900000),
            cost_usd: dec!(6.00),
            cost_lbp: dec!(540000),
            profit_usd: dec!(4.00),
            profit_lbp: dec!(360000),
            is_waste: false,
            has_manual_price_override: false,
        };
        let names = HashMap::from([(7, "Labneh 500g".to_string())]);

        let named = name_lines(std::slice::from_ref(&line), &names);
        assert_eq!(named[0].1.as_deref(), Some("Labneh 500g"));

        line.product_id = None;
        let named = name_lines(std::slice::from_ref(&line), &names);
        assert_eq!(named[0].1, None);
    }
}
