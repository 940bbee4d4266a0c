pub mod razorpay;

use async_trait::async_trait;

/// Pluggable gateway contract: authorize a charge, return the provider's
/// transaction id. The QR transfer path never touches this.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn authorize(&self, amount: i64, reference: &str) -> anyhow::Result<String>;
}
