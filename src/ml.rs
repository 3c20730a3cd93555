// src/ml.rs
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Client for the external vision classifier used as the pre-commit anomaly
/// gate. When `ML_SERVICE_URL` is not configured the gate is disabled and
/// every checkout passes.
#[derive(Clone)]
pub struct MlClient {
    http: reqwest::Client,
    base_url: Option<String>,
}

#[derive(Serialize)]
struct VisionRequest {
    product_id: String,
    embedding: Vec<f64>,
}

#[derive(Debug, Deserialize)]
pub struct VisionResult {
    pub predicted_label: String,
    pub confidence: f64,
    pub is_match: bool,
}

const MIN_CONFIDENCE: f64 = 0.6;

impl MlClient {
    pub fn from_env() -> Self {
        let base_url = std::env::var("ML_SERVICE_URL").ok().map(|url| {
            if url.ends_with('/') {
                url
            } else {
                format!("{url}/")
            }
        });
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.base_url.is_some()
    }

    /// Classifies a priced line. Returns `None` when the gate is disabled or
    /// the classifier is unreachable; an unreachable classifier must not
    /// block sales, so transport failures are logged and treated as a pass.
    pub async fn predict_vision(
        &self,
        product_id: i64,
        unit_price_usd: Decimal,
        quantity: Decimal,
    ) -> Option<VisionResult> {
        let base_url = self.base_url.as_ref()?;
        let request = VisionRequest {
            product_id: product_id.to_string(),
            embedding: vec![
                unit_price_usd.to_f64().unwrap_or_default(),
                quantity.to_f64().unwrap_or_default(),
            ],
        };

        let response = self
            .http
            .post(format!("{base_url}vision/predict"))
            .json(&request)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<VisionResult>().await {
                Ok(result) => Some(result),
                Err(err) => {
                    tracing::warn!(?err, product_id, "Vision classifier returned invalid body");
                    None
                }
            },
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), product_id, "Vision classifier error status");
                None
            }
            Err(err) => {
                tracing::warn!(?err, product_id, "Vision classifier unreachable");
                None
            }
        }
    }
}

impl VisionResult {
    /// A line is flagged when the classifier disagrees with the scanned
    /// product or is not confident enough about the match.
    pub fn is_flagged(&self) -> bool {
        !self.is_match || self.confidence < MIN_CONFIDENCE
    }

    pub fn flag_reason(&self) -> String {
        format!("vision:{}:{:.2}", self.predicted_label, self.confidence)
    }
}
