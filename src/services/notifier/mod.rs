pub mod mailer;

use async_trait::async_trait;

pub struct BookingConfirmation {
    pub to: String,
    pub name: String,
    pub booking_id: String,
    pub agent_name: String,
}

/// Outbound email, invoked best-effort at defined transitions. Callers log
/// failures and carry on; a send error must never roll back a state change.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_booking_confirmation(&self, confirmation: &BookingConfirmation)
        -> anyhow::Result<()>;

    async fn send_welcome(&self, to: &str, name: &str) -> anyhow::Result<()>;
}
