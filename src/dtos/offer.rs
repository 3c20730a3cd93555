use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::offer::Offer;

#[derive(Debug, Deserialize)]
pub struct OfferItemRequest {
    pub product_id: i64,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreateOfferRequest {
    pub name: String,
    pub description: Option<String>,
    /// Tendered in `currency`; the other side is derived from the current
    /// rate at creation time and both are then fixed.
    pub price: Decimal,
    /// "USD" or "LBP".
    pub currency: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub items: Vec<OfferItemRequest>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct OfferItemResponse {
    pub product_id: i64,
    pub product_name: Option<String>,
    pub quantity: Decimal,
}

#[derive(Debug, Serialize)]
pub struct OfferResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price_usd: Decimal,
    pub price_lbp: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OfferItemResponse>,
}

impl OfferResponse {
    pub fn from_parts(offer: Offer, items: Vec<OfferItemResponse>) -> Self {
        OfferResponse {
            id: offer.id,
            name: offer.name,
            description: offer.description,
            price_usd: offer.price_usd,
            price_lbp: offer.price_lbp,
            is_active: offer.is_active,
            created_at: offer.created_at,
            items,
        }
    }
}
