// src/pricing.rs
//
// Per-line pricing resolution. Every cart item is matched to exactly one
// pricing source, and each source has its own resolution function; the
// settlement layer is responsible for capability checks before pricing runs.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::currency::{round_lbp, round_usd, usd_to_lbp, lbp_to_usd};
use crate::dtos::transaction::CartItemRequest;
use crate::error::AppError;
use crate::models::product::PriceRule;
use crate::models::transaction::TransactionLine;

/// Everything pricing needs to know about a product, read once per cart.
#[derive(Debug, Clone)]
pub struct ProductSnapshot {
    pub id: i64,
    pub name: String,
    pub price_usd: Decimal,
    pub price_lbp: Decimal,
    /// Moving-average cost from the inventory record, if one exists.
    pub average_cost_usd: Option<Decimal>,
}

impl ProductSnapshot {
    /// Products that were never purchased have no inventory record; fall
    /// back to an assumed 60% cost so profit figures stay plausible.
    pub fn unit_cost_usd(&self) -> Decimal {
        self.average_cost_usd
            .unwrap_or_else(|| round_usd(self.price_usd * dec!(0.6)))
    }
}

/// A bundle with its fixed dual-currency price and component quantities.
/// Prices were normalized at definition time and are not re-derived here.
#[derive(Debug, Clone)]
pub struct OfferSnapshot {
    pub id: i64,
    pub name: String,
    pub price_usd: Decimal,
    pub price_lbp: Decimal,
    pub is_active: bool,
    pub components: Vec<(i64, Decimal)>,
}

/// A resolved line, ready to persist as a transaction line. `product_id` is
/// only absent on return mirrors of lines whose product was since deleted.
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub product_id: Option<i64>,
    pub price_rule_id: Option<i64>,
    pub offer_id: Option<i64>,
    pub quantity: Decimal,
    pub base_unit_price_usd: Decimal,
    pub base_unit_price_lbp: Decimal,
    pub unit_price_usd: Decimal,
    pub unit_price_lbp: Decimal,
    pub discount_percent: Decimal,
    pub total_usd: Decimal,
    pub total_lbp: Decimal,
    pub cost_usd: Decimal,
    pub cost_lbp: Decimal,
    pub profit_usd: Decimal,
    pub profit_lbp: Decimal,
    pub is_waste: bool,
    pub has_manual_price_override: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct PricingContext {
    pub rate: Decimal,
    pub now: DateTime<Utc>,
    pub allow_manual_pricing: bool,
    /// Self-purchase carts are priced at inventory cost, zero margin.
    pub price_at_cost_only: bool,
}

pub struct CartInputs<'a> {
    pub products: &'a HashMap<i64, ProductSnapshot>,
    pub rules_by_product: &'a HashMap<i64, Vec<PriceRule>>,
    pub offers: &'a HashMap<i64, OfferSnapshot>,
}

/// One pricing source per line; each variant carries exactly what its
/// resolution function needs.
enum PricingSource<'a> {
    Base,
    Rule(&'a PriceRule),
    Offer(&'a OfferSnapshot),
    /// Manual overrides may still reference a rule; the linkage is kept on
    /// the line for audit continuity.
    Manual(Option<&'a PriceRule>),
    AtCost,
    Waste,
}

#[derive(Debug, Clone, Default)]
pub struct PricedCart {
    pub total_usd: Decimal,
    pub total_lbp: Decimal,
    pub lines: Vec<PricedLine>,
}

pub fn price_cart(
    items: &[CartItemRequest],
    inputs: &CartInputs<'_>,
    ctx: &PricingContext,
) -> Result<PricedCart, AppError> {
    if items.is_empty() {
        return Err(AppError::validation("Cart must contain at least one item"));
    }

    let mut cart = PricedCart::default();
    for item in items {
        if item.quantity <= dec!(0) {
            return Err(AppError::validation("Quantity must be greater than zero"));
        }
        if let Some(discount) = item.manual_discount_percent {
            if discount < dec!(0) || discount > dec!(100) {
                return Err(AppError::validation(
                    "Discount must be between 0 and 100 percent",
                ));
            }
        }

        let lines = match select_source(item, inputs, ctx)? {
            PricingSource::Offer(offer) => price_offer(offer, item.quantity, inputs, ctx)?,
            PricingSource::Waste => vec![price_waste(product_for(item, inputs)?, item, ctx)],
            PricingSource::AtCost => vec![price_at_cost(product_for(item, inputs)?, item, ctx)],
            PricingSource::Manual(rule) => {
                vec![price_manual(product_for(item, inputs)?, rule, item, ctx)]
            }
            PricingSource::Rule(rule) => {
                vec![price_with_rule(product_for(item, inputs)?, rule, item, ctx)]
            }
            PricingSource::Base => vec![price_base(product_for(item, inputs)?, item, ctx)],
        };

        for line in lines {
            cart.total_usd += line.total_usd;
            cart.total_lbp += line.total_lbp;
            cart.lines.push(line);
        }
    }

    cart.total_usd = round_usd(cart.total_usd);
    cart.total_lbp = round_lbp(cart.total_lbp);
    Ok(cart)
}

fn product_for<'a>(
    item: &CartItemRequest,
    inputs: &'a CartInputs<'_>,
) -> Result<&'a ProductSnapshot, AppError> {
    let product_id = item
        .product_id
        .ok_or_else(|| AppError::validation("Item is missing a product id"))?;
    inputs
        .products
        .get(&product_id)
        .ok_or_else(|| AppError::not_found(format!("Product {product_id} not found")))
}

fn select_source<'a>(
    item: &CartItemRequest,
    inputs: &'a CartInputs<'_>,
    ctx: &PricingContext,
) -> Result<PricingSource<'a>, AppError> {
    if item.is_waste {
        return Ok(PricingSource::Waste);
    }

    if let Some(offer_id) = item.offer_id {
        let offer = inputs
            .offers
            .get(&offer_id)
            .ok_or_else(|| AppError::not_found(format!("Offer {offer_id} not found")))?;
        if !offer.is_active {
            return Err(AppError::validation(format!(
                "Offer '{}' is not active",
                offer.name
            )));
        }
        return Ok(PricingSource::Offer(offer));
    }

    if ctx.price_at_cost_only {
        return Ok(PricingSource::AtCost);
    }

    let product = product_for(item, inputs)?;
    let rules = inputs
        .rules_by_product
        .get(&product.id)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let explicit_rule = match item.price_rule_id {
        Some(rule_id) => Some(
            rules
                .iter()
                .find(|rule| rule.id == rule_id && rule.is_active_at(ctx.now))
                .ok_or_else(|| AppError::not_found(format!("Price rule {rule_id} not found")))?,
        ),
        None => None,
    };

    if ctx.allow_manual_pricing && item.has_manual_price() {
        return Ok(PricingSource::Manual(explicit_rule));
    }

    if let Some(rule) = explicit_rule {
        return Ok(PricingSource::Rule(rule));
    }

    // Overlapping active rules are rejected at creation time; should legacy
    // data still contain an overlap, the lowest id wins deterministically.
    let auto = rules
        .iter()
        .filter(|rule| rule.is_active_at(ctx.now))
        .min_by_key(|rule| rule.id);
    match auto {
        Some(rule) => Ok(PricingSource::Rule(rule)),
        None => Ok(PricingSource::Base),
    }
}

/// Assembles a line from resolved unit prices, deriving totals, cost and
/// profit under the standard rounding rules.
fn build_line(
    product: &ProductSnapshot,
    quantity: Decimal,
    unit_price_usd: Decimal,
    unit_price_lbp: Decimal,
    discount_percent: Decimal,
    ctx: &PricingContext,
) -> PricedLine {
    let base_unit_price_usd = round_usd(product.price_usd);
    let base_unit_price_lbp = usd_to_lbp(base_unit_price_usd, ctx.rate);
    let total_usd = round_usd(unit_price_usd * quantity);
    let total_lbp = round_lbp(unit_price_lbp * quantity);
    let cost_usd = round_usd(product.unit_cost_usd() * quantity);
    let cost_lbp = usd_to_lbp(cost_usd, ctx.rate);

    PricedLine {
        product_id: Some(product.id),
        price_rule_id: None,
        offer_id: None,
        quantity,
        base_unit_price_usd,
        base_unit_price_lbp,
        unit_price_usd: round_usd(unit_price_usd),
        unit_price_lbp: round_lbp(unit_price_lbp),
        discount_percent,
        total_usd,
        total_lbp,
        cost_usd,
        cost_lbp,
        profit_usd: round_usd(total_usd - cost_usd),
        profit_lbp: round_lbp(total_lbp - cost_lbp),
        is_waste: false,
        has_manual_price_override: false,
    }
}

fn price_base(
    product: &ProductSnapshot,
    item: &CartItemRequest,
    ctx: &PricingContext,
) -> PricedLine {
    let unit_usd = product.price_usd;
    let unit_lbp = usd_to_lbp(unit_usd, ctx.rate);
    build_line(product, item.quantity, unit_usd, unit_lbp, dec!(0), ctx)
}

fn price_with_rule(
    product: &ProductSnapshot,
    rule: &PriceRule,
    item: &CartItemRequest,
    ctx: &PricingContext,
) -> PricedLine {
    let discount = rule.discount_percent.clamp(dec!(0), dec!(100));
    let unit_usd = product.price_usd * (dec!(100) - discount) / dec!(100);
    let unit_lbp = usd_to_lbp(unit_usd, ctx.rate);
    let mut line = build_line(product, item.quantity, unit_usd, unit_lbp, discount, ctx);
    line.price_rule_id = Some(rule.id);
    line
}

/// The bundle's fixed price applies to the aggregate, never per unit. The
/// offer is decomposed into one line per component so inventory decrement
/// and cost attribution stay per-product; the bundle revenue is carried on
/// the first component line and the rest record cost only, which keeps the
/// aggregate profit exactly `offer price - summed component cost`.
fn price_offer(
    offer: &OfferSnapshot,
    bundles: Decimal,
    inputs: &CartInputs<'_>,
    ctx: &PricingContext,
) -> Result<Vec<PricedLine>, AppError> {
    let bundle_total_usd = round_usd(offer.price_usd * bundles);
    let bundle_total_lbp = round_lbp(offer.price_lbp * bundles);

    let mut lines = Vec::with_capacity(offer.components.len());
    for (index, (product_id, component_qty)) in offer.components.iter().enumerate() {
        let product = inputs
            .products
            .get(product_id)
            .ok_or_else(|| AppError::not_found(format!("Product {product_id} not found")))?;

        let quantity = component_qty * bundles;
        let (total_usd, total_lbp) = if index == 0 {
            (bundle_total_usd, bundle_total_lbp)
        } else {
            (dec!(0), dec!(0))
        };

        let cost_usd = round_usd(product.unit_cost_usd() * quantity);
        let cost_lbp = usd_to_lbp(cost_usd, ctx.rate);
        let unit_price_usd = if quantity == dec!(0) {
            dec!(0)
        } else {
            round_usd(total_usd / quantity)
        };

        lines.push(PricedLine {
            product_id: Some(product.id),
            price_rule_id: None,
            offer_id: Some(offer.id),
            quantity,
            base_unit_price_usd: round_usd(product.price_usd),
            base_unit_price_lbp: usd_to_lbp(product.price_usd, ctx.rate),
            unit_price_usd,
            unit_price_lbp: usd_to_lbp(unit_price_usd, ctx.rate),
            discount_percent: dec!(0),
            total_usd,
            total_lbp,
            cost_usd,
            cost_lbp,
            profit_usd: round_usd(total_usd - cost_usd),
            profit_lbp: round_lbp(total_lbp - cost_lbp),
            is_waste: false,
            has_manual_price_override: false,
        });
    }

    Ok(lines)
}

/// Manual overrides start from the rule-discounted price when a rule was
/// requested alongside them, and the rule stays linked on the line.
fn price_manual(
    product: &ProductSnapshot,
    rule: Option<&PriceRule>,
    item: &CartItemRequest,
    ctx: &PricingContext,
) -> PricedLine {
    let base_usd = product.price_usd;
    let mut discount = rule
        .map(|r| r.discount_percent.clamp(dec!(0), dec!(100)))
        .unwrap_or(dec!(0));
    let mut unit_usd = base_usd * (dec!(100) - discount) / dec!(100);
    let mut unit_lbp = usd_to_lbp(unit_usd, ctx.rate);
    let mut usd_overridden = false;
    let mut lbp_overridden = false;

    if let Some(percent) = item.manual_discount_percent {
        discount = percent.clamp(dec!(0), dec!(100));
        unit_usd = base_usd * (dec!(100) - discount) / dec!(100);
        unit_lbp = usd_to_lbp(unit_usd, ctx.rate);
    }

    if let Some(price) = item.manual_unit_price_usd {
        unit_usd = price;
        usd_overridden = true;
    }
    if let Some(total) = item.manual_total_usd {
        unit_usd = if item.quantity == dec!(0) {
            dec!(0)
        } else {
            total / item.quantity
        };
        usd_overridden = true;
    }
    if let Some(price) = item.manual_unit_price_lbp {
        unit_lbp = price;
        lbp_overridden = true;
    }
    if let Some(total) = item.manual_total_lbp {
        unit_lbp = if item.quantity == dec!(0) {
            dec!(0)
        } else {
            total / item.quantity
        };
        lbp_overridden = true;
    }

    // A one-sided override keeps both currencies consistent via the rate.
    if usd_overridden && !lbp_overridden {
        unit_lbp = usd_to_lbp(unit_usd, ctx.rate);
    } else if lbp_overridden && !usd_overridden {
        unit_usd = lbp_to_usd(unit_lbp, ctx.rate);
    }

    let mut line = build_line(product, item.quantity, unit_usd, unit_lbp, discount, ctx);
    line.price_rule_id = rule.map(|r| r.id);
    line.has_manual_price_override = true;
    line
}

fn price_at_cost(
    product: &ProductSnapshot,
    item: &CartItemRequest,
    ctx: &PricingContext,
) -> PricedLine {
    let unit_usd = product.unit_cost_usd();
    let unit_lbp = usd_to_lbp(unit_usd, ctx.rate);
    let mut line = build_line(product, item.quantity, unit_usd, unit_lbp, dec!(0), ctx);
    line.has_manual_price_override = true;
    line
}

/// Spoilage write-off: positive quantity, zero revenue, cost still recorded
/// so the loss shows up as negative profit.
fn price_waste(
    product: &ProductSnapshot,
    item: &CartItemRequest,
    ctx: &PricingContext,
) -> PricedLine {
    let mut line = build_line(product, item.quantity, dec!(0), dec!(0), dec!(0), ctx);
    line.is_waste = true;
    line.profit_usd = round_usd(-line.cost_usd);
    line.profit_lbp = round_lbp(-line.cost_lbp);
    line
}

/// Builds the mirror of a settled line for a return transaction: magnitudes
/// preserved, signs forced negative. Forcing (rather than flipping) the sign
/// guards against double negation when someone tries to return a return.
pub fn mirror_line(line: &TransactionLine) -> PricedLine {
    PricedLine {
        product_id: line.product_id,
        price_rule_id: line.price_rule_id,
        offer_id: line.offer_id,
        quantity: -line.quantity.abs(),
        base_unit_price_usd: line.base_unit_price_usd,
        base_unit_price_lbp: line.base_unit_price_lbp,
        unit_price_usd: line.unit_price_usd,
        unit_price_lbp: line.unit_price_lbp,
        discount_percent: line.discount_percent,
        total_usd: -line.total_usd.abs(),
        total_lbp: -line.total_lbp.abs(),
        cost_usd: -line.cost_usd.abs(),
        cost_lbp: -line.cost_lbp.abs(),
        profit_usd: -line.profit_usd.abs(),
        profit_lbp: -line.profit_lbp.abs(),
        is_waste: false,
        has_manual_price_override: line.has_manual_price_override,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ctx(rate: Decimal) -> PricingContext {
        PricingContext {
            rate,
            now: Utc::now(),
            allow_manual_pricing: false,
            price_at_cost_only: false,
        }
    }

    fn snapshot(id: i64, price_usd: Decimal, cost: Option<Decimal>) -> ProductSnapshot {
        ProductSnapshot {
            id,
            name: format!("Product {id}"),
            price_usd,
            price_lbp: price_usd * dec!(90000),
            average_cost_usd: cost,
        }
    }

    fn item(product_id: i64, quantity: Decimal) -> CartItemRequest {
        CartItemRequest {
            product_id: Some(product_id),
            quantity,
            price_rule_id: None,
            offer_id: None,
            manual_discount_percent: None,
            manual_unit_price_usd: None,
            manual_unit_price_lbp: None,
            manual_total_usd: None,
            manual_total_lbp: None,
            is_waste: false,
        }
    }

    fn inputs_for<'a>(
        products: &'a HashMap<i64, ProductSnapshot>,
        rules: &'a HashMap<i64, Vec<PriceRule>>,
        offers: &'a HashMap<i64, OfferSnapshot>,
    ) -> CartInputs<'a> {
        CartInputs {
            products,
            rules_by_product: rules,
            offers,
        }
    }

    fn rule(id: i64, product_id: i64, discount: Decimal) -> PriceRule {
        PriceRule {
            id,
            product_id,
            discount_percent: discount,
            starts_at: Utc::now() - Duration::days(1),
            ends_at: None,
            description: None,
            is_active: true,
        }
    }

    #[test]
    fn base_line_totals_in_both_currencies() {
        let products = HashMap::from([(1, snapshot(1, dec!(10.00), Some(dec!(6.00))))]);
        let rules = HashMap::new();
        let offers = HashMap::new();
        let inputs = inputs_for(&products, &rules, &offers);

        let cart = price_cart(&[item(1, dec!(3))], &inputs, &ctx(dec!(90000))).unwrap();
        assert_eq!(cart.total_usd, dec!(30.00));
        assert_eq!(cart.total_lbp, dec!(2700000));
        let line = &cart.lines[0];
        assert_eq!(line.cost_usd, dec!(18.00));
        assert_eq!(line.profit_usd, dec!(12.00));
        assert_eq!(line.profit_lbp, line.total_lbp - line.cost_lbp);
    }

    #[test]
    fn active_rule_is_auto_selected() {
        let products = HashMap::from([(1, snapshot(1, dec!(10.00), Some(dec!(6.00))))]);
        let rules = HashMap::from([(1, vec![rule(7, 1, dec!(25))])]);
        let offers = HashMap::new();
        let inputs = inputs_for(&products, &rules, &offers);

        let cart = price_cart(&[item(1, dec!(2))], &inputs, &ctx(dec!(90000))).unwrap();
        let line = &cart.lines[0];
        assert_eq!(line.price_rule_id, Some(7));
        assert_eq!(line.discount_percent, dec!(25));
        assert_eq!(line.unit_price_usd, dec!(7.50));
        assert_eq!(line.total_usd, dec!(15.00));
        assert_eq!(line.base_unit_price_usd, dec!(10.00));
    }

    #[test]
    fn overlapping_rules_resolve_to_lowest_id() {
        let products = HashMap::from([(1, snapshot(1, dec!(10.00), None))]);
        let rules = HashMap::from([(1, vec![rule(9, 1, dec!(50)), rule(4, 1, dec!(10))])]);
        let offers = HashMap::new();
        let inputs = inputs_for(&products, &rules, &offers);

        let cart = price_cart(&[item(1, dec!(1))], &inputs, &ctx(dec!(90000))).unwrap();
        assert_eq!(cart.lines[0].price_rule_id, Some(4));
    }

    #[test]
    fn explicit_unknown_rule_fails_the_whole_cart() {
        let products = HashMap::from([(1, snapshot(1, dec!(10.00), None))]);
        let rules = HashMap::new();
        let offers = HashMap::new();
        let inputs = inputs_for(&products, &rules, &offers);

        let mut requested = item(1, dec!(1));
        requested.price_rule_id = Some(99);
        let err = price_cart(&[requested], &inputs, &ctx(dec!(90000))).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn offer_pricing_ignores_product_rules_and_decomposes_components() {
        let products = HashMap::from([
            (1, snapshot(1, dec!(10.00), Some(dec!(6.00)))),
            (2, snapshot(2, dec!(4.00), Some(dec!(2.00)))),
        ]);
        // A 50% rule on product 1 must be ignored for the offer line.
        let rules = HashMap::from([(1, vec![rule(1, 1, dec!(50))])]);
        let offers = HashMap::from([(
            5,
            OfferSnapshot {
                id: 5,
                name: "Breakfast kit".into(),
                price_usd: dec!(12.00),
                price_lbp: dec!(1080000),
                is_active: true,
                components: vec![(1, dec!(1)), (2, dec!(2))],
            },
        )]);
        let inputs = inputs_for(&products, &rules, &offers);

        let mut requested = item(1, dec!(2));
        requested.offer_id = Some(5);
        let cart = price_cart(&[requested], &inputs, &ctx(dec!(90000))).unwrap();

        assert_eq!(cart.lines.len(), 2);
        assert_eq!(cart.total_usd, dec!(24.00));
        assert_eq!(cart.total_lbp, dec!(2160000));

        // 2 bundles: product 1 x2, product 2 x4.
        assert_eq!(cart.lines[0].quantity, dec!(2));
        assert_eq!(cart.lines[1].quantity, dec!(4));
        assert!(cart.lines.iter().all(|l| l.offer_id == Some(5)));
        assert!(cart.lines.iter().all(|l| l.price_rule_id.is_none()));

        // Bundle profit = 24 - (2*6 + 4*2) = 4, split as total - cost per line.
        let profit: Decimal = cart.lines.iter().map(|l| l.profit_usd).sum();
        assert_eq!(profit, dec!(4.00));
    }

    #[test]
    fn at_cost_lines_have_zero_profit() {
        let products = HashMap::from([(1, snapshot(1, dec!(10.00), Some(dec!(6.40))))]);
        let rules = HashMap::new();
        let offers = HashMap::new();
        let inputs = inputs_for(&products, &rules, &offers);

        let mut context = ctx(dec!(90000));
        context.price_at_cost_only = true;
        let cart = price_cart(&[item(1, dec!(3))], &inputs, &context).unwrap();
        let line = &cart.lines[0];
        assert_eq!(line.unit_price_usd, dec!(6.40));
        assert_eq!(line.profit_usd, dec!(0.00));
        assert_eq!(line.profit_lbp, dec!(0));
        assert!(line.has_manual_price_override);
    }

    #[test]
    fn waste_lines_zero_revenue_but_record_cost() {
        let products = HashMap::from([(1, snapshot(1, dec!(10.00), Some(dec!(6.00))))]);
        let rules = HashMap::new();
        let offers = HashMap::new();
        let inputs = inputs_for(&products, &rules, &offers);

        let mut requested = item(1, dec!(2));
        requested.is_waste = true;
        let cart = price_cart(&[requested], &inputs, &ctx(dec!(90000))).unwrap();
        let line = &cart.lines[0];
        assert_eq!(line.quantity, dec!(2));
        assert_eq!(line.total_usd, dec!(0.00));
        assert_eq!(line.cost_usd, dec!(12.00));
        assert_eq!(line.profit_usd, dec!(-12.00));
        assert!(line.is_waste);
    }

    #[test]
    fn manual_unit_price_wins_over_rule() {
        let products = HashMap::from([(1, snapshot(1, dec!(10.00), Some(dec!(6.00))))]);
        let rules = HashMap::from([(1, vec![rule(1, 1, dec!(50))])]);
        let offers = HashMap::new();
        let inputs = inputs_for(&products, &rules, &offers);

        let mut requested = item(1, dec!(2));
        requested.manual_unit_price_usd = Some(dec!(8.00));
        let mut context = ctx(dec!(90000));
        context.allow_manual_pricing = true;
        let cart = price_cart(&[requested], &inputs, &context).unwrap();
        let line = &cart.lines[0];
        assert_eq!(line.unit_price_usd, dec!(8.00));
        assert_eq!(line.unit_price_lbp, dec!(720000));
        assert_eq!(line.total_usd, dec!(16.00));
        assert!(line.has_manual_price_override);
    }

    #[test]
    fn manual_override_keeps_requested_rule_linkage() {
        let products = HashMap::from([(1, snapshot(1, dec!(10.00), Some(dec!(6.00))))]);
        let rules = HashMap::from([(1, vec![rule(7, 1, dec!(25))])]);
        let offers = HashMap::new();
        let inputs = inputs_for(&products, &rules, &offers);

        let mut requested = item(1, dec!(2));
        requested.price_rule_id = Some(7);
        requested.manual_unit_price_usd = Some(dec!(8.00));
        let mut context = ctx(dec!(90000));
        context.allow_manual_pricing = true;
        let cart = price_cart(&[requested], &inputs, &context).unwrap();
        let line = &cart.lines[0];
        assert_eq!(line.price_rule_id, Some(7));
        assert_eq!(line.unit_price_usd, dec!(8.00));
        assert!(line.has_manual_price_override);
    }

    #[test]
    fn rule_price_is_the_baseline_under_a_manual_discount() {
        let products = HashMap::from([(1, snapshot(1, dec!(10.00), None))]);
        let rules = HashMap::from([(1, vec![rule(7, 1, dec!(25))])]);
        let offers = HashMap::new();
        let inputs = inputs_for(&products, &rules, &offers);

        // A manual discount replaces the rule's percentage but the rule
        // stays linked on the line.
        let mut requested = item(1, dec!(1));
        requested.price_rule_id = Some(7);
        requested.manual_discount_percent = Some(dec!(10));
        let mut context = ctx(dec!(90000));
        context.allow_manual_pricing = true;
        let cart = price_cart(&[requested], &inputs, &context).unwrap();
        assert_eq!(cart.lines[0].unit_price_usd, dec!(9.00));
        assert_eq!(cart.lines[0].discount_percent, dec!(10));
        assert_eq!(cart.lines[0].price_rule_id, Some(7));
    }

    #[test]
    fn manual_lbp_total_back_fills_usd_side() {
        let products = HashMap::from([(1, snapshot(1, dec!(10.00), None))]);
        let rules = HashMap::new();
        let offers = HashMap::new();
        let inputs = inputs_for(&products, &rules, &offers);

        let mut requested = item(1, dec!(4));
        requested.manual_total_lbp = Some(dec!(1800000));
        let mut context = ctx(dec!(90000));
        context.allow_manual_pricing = true;
        let cart = price_cart(&[requested], &inputs, &context).unwrap();
        let line = &cart.lines[0];
        assert_eq!(line.total_lbp, dec!(1800000));
        assert_eq!(line.unit_price_usd, dec!(5.00));
        assert_eq!(line.total_usd, dec!(20.00));
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let products = HashMap::from([(1, snapshot(1, dec!(10.00), None))]);
        let rules = HashMap::new();
        let offers = HashMap::new();
        let inputs = inputs_for(&products, &rules, &offers);

        let err = price_cart(&[item(1, dec!(0))], &inputs, &ctx(dec!(90000))).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn unknown_product_aborts_without_partial_pricing() {
        let products = HashMap::from([(1, snapshot(1, dec!(10.00), None))]);
        let rules = HashMap::new();
        let offers = HashMap::new();
        let inputs = inputs_for(&products, &rules, &offers);

        let err = price_cart(
            &[item(1, dec!(1)), item(42, dec!(1))],
            &inputs,
            &ctx(dec!(90000)),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    fn settled_line(quantity: Decimal, total: Decimal, cost: Decimal) -> TransactionLine {
        TransactionLine {
            id: 1,
            transaction_id: 1,
            product_id: Some(1),
            price_rule_id: None,
            offer_id: None,
            quantity,
            base_unit_price_usd: dec!(10.00),
            base_unit_price_lbp: dec!(900000),
            unit_price_usd: dec!(10.00),
            unit_price_lbp: dec!(900000),
            discount_percent: dec!(0),
            total_usd: total,
            total_lbp: total * dec!(90000),
            cost_usd: cost,
            cost_lbp: cost * dec!(90000),
            profit_usd: total - cost,
            profit_lbp: (total - cost) * dec!(90000),
            is_waste: false,
            has_manual_price_override: false,
        }
    }

    #[test]
    fn return_mirrors_sale_with_flipped_signs() {
        let line = settled_line(dec!(3), dec!(30.00), dec!(18.00));
        let mirror = mirror_line(&line);
        assert_eq!(mirror.quantity, dec!(-3));
        assert_eq!(mirror.total_usd, dec!(-30.00));
        assert_eq!(mirror.cost_usd, dec!(-18.00));
        assert_eq!(mirror.profit_usd, dec!(-12.00));
    }

    #[test]
    fn returning_a_return_never_double_negates() {
        let line = settled_line(dec!(-3), dec!(-30.00), dec!(-18.00));
        let mirror = mirror_line(&line);
        assert_eq!(mirror.quantity, dec!(-3));
        assert_eq!(mirror.total_usd, dec!(-30.00));
        assert_eq!(mirror.cost_usd, dec!(-18.00));
    }
}
