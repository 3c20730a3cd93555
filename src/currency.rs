// src/currency.rs
//
// All rounding and cross-currency conversion lives here. USD amounts carry
// 2 fractional digits, LBP amounts are whole units, both rounded half away
// from zero at the point of storage.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::currency_rate::CurrencyRate;

pub fn round_usd(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn round_lbp(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

pub fn usd_to_lbp(amount_usd: Decimal, rate: Decimal) -> Decimal {
    round_lbp(amount_usd * rate)
}

pub fn lbp_to_usd(amount_lbp: Decimal, rate: Decimal) -> Decimal {
    round_usd(amount_lbp / rate)
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BalanceBreakdown {
    pub total_usd: Decimal,
    pub total_lbp: Decimal,
    pub balance_usd: Decimal,
    pub balance_lbp: Decimal,
}

/// Computes what is still owed (positive) or due back as change (negative),
/// per currency independently. A customer who overpays in USD while
/// underpaying in LBP gets a negative USD balance and a positive LBP balance
/// at the same time; change is returned in the currency it accrued in and is
/// never netted across currencies.
pub fn compute_balance(
    total_usd: Decimal,
    paid_usd: Decimal,
    paid_lbp: Decimal,
    rate: Decimal,
    total_lbp_override: Option<Decimal>,
) -> BalanceBreakdown {
    let total_usd = round_usd(total_usd);
    let total_lbp = match total_lbp_override {
        Some(total) => round_lbp(total),
        None => usd_to_lbp(total_usd, rate),
    };

    BalanceBreakdown {
        total_usd,
        total_lbp,
        balance_usd: round_usd(total_usd - paid_usd),
        balance_lbp: round_lbp(total_lbp - paid_lbp),
    }
}

/// Latest row of the append-only rate log. Pricing is impossible without a
/// configured rate, so an empty log is a configuration error.
pub async fn current_rate(db_pool: &PgPool) -> Result<CurrencyRate, AppError> {
    sqlx::query_as::<_, CurrencyRate>(
        "SELECT id, rate, notes, entered_by, created_at
         FROM currency_rates ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .fetch_optional(db_pool)
    .await?
    .ok_or_else(|| AppError::configuration("No exchange rate configured"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_usd_half_away_from_zero() {
        assert_eq!(round_usd(dec!(10.005)), dec!(10.01));
        assert_eq!(round_usd(dec!(-10.005)), dec!(-10.01));
        assert_eq!(round_usd(dec!(10.004)), dec!(10.00));
    }

    #[test]
    fn rounds_lbp_to_whole_units() {
        assert_eq!(round_lbp(dec!(1500.5)), dec!(1501));
        assert_eq!(round_lbp(dec!(-1500.5)), dec!(-1501));
        assert_eq!(round_lbp(dec!(1500.4)), dec!(1500));
    }

    #[test]
    fn rounding_is_idempotent() {
        for raw in [dec!(0.005), dec!(12.345), dec!(-7.775), dec!(99999.999)] {
            assert_eq!(round_usd(round_usd(raw)), round_usd(raw));
            assert_eq!(round_lbp(round_lbp(raw)), round_lbp(raw));
        }
    }

    #[test]
    fn converts_between_currencies() {
        assert_eq!(usd_to_lbp(dec!(10.00), dec!(90000)), dec!(900000));
        assert_eq!(lbp_to_usd(dec!(900000), dec!(90000)), dec!(10.00));
        assert_eq!(lbp_to_usd(dec!(100), dec!(90000)), dec!(0.00));
    }

    #[test]
    fn balance_is_computed_per_currency_without_netting() {
        // $30 cart, rate 90000: the USD payment settles the USD column only;
        // the LBP column still shows the full LBP total outstanding.
        let balance = compute_balance(dec!(30.00), dec!(30), dec!(0), dec!(90000), None);
        assert_eq!(balance.total_usd, dec!(30.00));
        assert_eq!(balance.total_lbp, dec!(2700000));
        assert_eq!(balance.balance_usd, dec!(0.00));
        assert_eq!(balance.balance_lbp, dec!(2700000));
    }

    #[test]
    fn overpaid_usd_never_offsets_lbp_owed() {
        let balance = compute_balance(dec!(30.00), dec!(40), dec!(0), dec!(90000), None);
        assert_eq!(balance.balance_usd, dec!(-10.00));
        assert_eq!(balance.balance_lbp, dec!(2700000));
    }

    #[test]
    fn balance_respects_lbp_total_override() {
        let balance =
            compute_balance(dec!(10.00), dec!(0), dec!(0), dec!(90000), Some(dec!(850000)));
        assert_eq!(balance.total_lbp, dec!(850000));
        assert_eq!(balance.balance_lbp, dec!(850000));
    }

    #[test]
    fn balance_is_pure() {
        let a = compute_balance(dec!(17.35), dec!(10), dec!(250000), dec!(89500), None);
        let b = compute_balance(dec!(17.35), dec!(10), dec!(250000), dec!(89500), None);
        assert_eq!(a.balance_usd, b.balance_usd);
        assert_eq!(a.balance_lbp, b.balance_lbp);
    }
}
