use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub mailer_api_url: String,
    pub mailer_api_key: String,
    pub mailer_from: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "pujabook.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            mailer_api_url: env::var("MAILER_API_URL").unwrap_or_default(),
            mailer_api_key: env::var("MAILER_API_KEY").unwrap_or_default(),
            mailer_from: env::var("MAILER_FROM")
                .unwrap_or_else(|_| "bookings@pujabook.example".to_string()),
            razorpay_key_id: env::var("RAZORPAY_KEY_ID").unwrap_or_default(),
            razorpay_key_secret: env::var("RAZORPAY_KEY_SECRET").unwrap_or_default(),
        }
    }
}
