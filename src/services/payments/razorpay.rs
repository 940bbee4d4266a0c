use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::PaymentProvider;

/// Razorpay Orders API provider. Without credentials it fails closed, which
/// steers checkouts to the manual QR path.
pub struct RazorpayProvider {
    key_id: String,
    key_secret: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
}

impl RazorpayProvider {
    pub fn new(key_id: String, key_secret: String) -> Self {
        Self {
            key_id,
            key_secret,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentProvider for RazorpayProvider {
    async fn authorize(&self, amount: i64, reference: &str) -> anyhow::Result<String> {
        anyhow::ensure!(
            !self.key_id.is_empty() && !self.key_secret.is_empty(),
            "payment gateway is not configured"
        );

        // Razorpay amounts are in paise.
        let body = serde_json::json!({
            "amount": amount * 100,
            "currency": "INR",
            "receipt": reference,
        });

        let response: OrderResponse = self
            .client
            .post("https://api.razorpay.com/v1/orders")
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .context("failed to reach payment gateway")?
            .error_for_status()
            .context("payment gateway returned error")?
            .json()
            .await
            .context("failed to parse payment gateway response")?;

        Ok(response.id)
    }
}
