use axum::extract::Query;
use axum::{extract::State, Extension, Json};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use crate::dtos::my_cart::{MyCartSummaryResponse, PersonalPurchaseResponse};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub date: Option<NaiveDate>,
}

/// Day / month / year totals of the caller's own self-purchases.
#[instrument(skip(state, auth))]
pub async fn my_cart_summary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<MyCartSummaryResponse>, AppError> {
    auth.require_privileged()?;

    let reference = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let day_start = reference;
    let day_end = reference + Duration::days(1);
    let month_start = reference.with_day(1).unwrap_or(reference);
    let month_end = next_month(month_start);
    let year_start = NaiveDate::from_ymd_opt(reference.year(), 1, 1).unwrap_or(reference);
    let year_end = NaiveDate::from_ymd_opt(reference.year() + 1, 1, 1).unwrap_or(reference);

    let (daily_total_usd, daily_total_lbp) = sum_range(&state, auth.user_id, day_start, day_end).await?;
    let (monthly_total_usd, monthly_total_lbp) =
        sum_range(&state, auth.user_id, month_start, month_end).await?;
    let (yearly_total_usd, yearly_total_lbp) =
        sum_range(&state, auth.user_id, year_start, year_end).await?;

    Ok(Json(MyCartSummaryResponse {
        reference_date: reference,
        daily_total_usd,
        daily_total_lbp,
        monthly_total_usd,
        monthly_total_lbp,
        yearly_total_usd,
        yearly_total_lbp,
    }))
}

#[instrument(skip(state, auth))]
pub async fn list_my_purchases(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<PersonalPurchaseResponse>>, AppError> {
    auth.require_privileged()?;

    let purchases = sqlx::query_as::<_, PersonalPurchaseResponse>(
        "SELECT pp.id, pp.transaction_id, t.transaction_number, pp.total_usd, pp.total_lbp, pp.purchase_date
         FROM personal_purchases pp
         JOIN transactions t ON t.id = pp.transaction_id
         WHERE pp.user_id = $1
         ORDER BY pp.purchase_date DESC, pp.id DESC
         LIMIT 100",
    )
    .bind(auth.user_id)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(purchases))
}

async fn sum_range(
    state: &AppState,
    user_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<(Decimal, Decimal), AppError> {
    let row = sqlx::query_as::<_, (Option<Decimal>, Option<Decimal>)>(
        "SELECT SUM(total_usd), SUM(total_lbp) FROM personal_purchases
         WHERE user_id = $1 AND purchase_date >= $2 AND purchase_date < $3",
    )
    .bind(user_id)
    .bind(from.and_hms_opt(0, 0, 0).map(|d| d.and_utc()))
    .bind(to.and_hms_opt(0, 0, 0).map(|d| d.and_utc()))
    .fetch_one(&state.db_pool)
    .await?;

    Ok((row.0.unwrap_or_default(), row.1.unwrap_or_default()))
}

fn next_month(month_start: NaiveDate) -> NaiveDate {
    if month_start.month() == 12 {
        NaiveDate::from_ymd_opt(month_start.year() + 1, 1, 1).unwrap_or(month_start)
    } else {
        NaiveDate::from_ymd_opt(month_start.year(), month_start.month() + 1, 1)
            .unwrap_or(month_start)
    }
}
