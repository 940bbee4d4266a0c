use anyhow::Context;
use async_trait::async_trait;

use super::{BookingConfirmation, Notifier};

/// HTTP mail-relay notifier (Mailgun-style messages endpoint).
pub struct HttpMailNotifier {
    api_url: String,
    api_key: String,
    from: String,
    client: reqwest::Client,
}

impl HttpMailNotifier {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            api_url,
            api_key,
            from,
            client: reqwest::Client::new(),
        }
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        self.client
            .post(&self.api_url)
            .basic_auth("api", Some(&self.api_key))
            .form(&[
                ("from", self.from.as_str()),
                ("to", to),
                ("subject", subject),
                ("text", body),
            ])
            .send()
            .await
            .context("failed to reach mail relay")?
            .error_for_status()
            .context("mail relay returned error")?;

        Ok(())
    }
}

#[async_trait]
impl Notifier for HttpMailNotifier {
    async fn send_booking_confirmation(
        &self,
        confirmation: &BookingConfirmation,
    ) -> anyhow::Result<()> {
        let subject = "Your booking is confirmed";
        let body = format!(
            "Namaste {},\n\nYour booking {} is confirmed. {} has been assigned \
             to perform your ritual and will contact you before the booked date.\n",
            confirmation.name, confirmation.booking_id, confirmation.agent_name
        );
        self.send(&confirmation.to, subject, &body).await
    }

    async fn send_welcome(&self, to: &str, name: &str) -> anyhow::Result<()> {
        let body = format!(
            "Namaste {name},\n\nYour account has been created. You can now book \
             pujas and rituals across our partner locations.\n"
        );
        self.send(to, "Welcome to Pujabook", &body).await
    }
}
