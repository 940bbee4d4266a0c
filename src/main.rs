use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use pujabook::config::AppConfig;
use pujabook::db;
use pujabook::handlers;
use pujabook::services::notifier::mailer::HttpMailNotifier;
use pujabook::services::payments::razorpay::RazorpayProvider;
use pujabook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    if config.mailer_api_url.is_empty() {
        tracing::warn!("MAILER_API_URL not set, outbound emails will fail (and be logged)");
    }
    if config.razorpay_key_id.is_empty() {
        tracing::info!("payment gateway not configured, checkout will steer to QR transfers");
    }

    let notifier = HttpMailNotifier::new(
        config.mailer_api_url.clone(),
        config.mailer_api_key.clone(),
        config.mailer_from.clone(),
    );
    let payments = RazorpayProvider::new(
        config.razorpay_key_id.clone(),
        config.razorpay_key_secret.clone(),
    );

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        notifier: Box::new(notifier),
        payments: Box::new(payments),
    });

    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/clients/register", post(handlers::clients::register))
        .route("/api/catalog/services", get(handlers::catalog::list_services))
        .route("/api/catalog/locations", get(handlers::catalog::list_locations))
        .route("/api/catalog/locations/:id", get(handlers::catalog::get_location))
        .route("/api/catalog/pujas", get(handlers::catalog::list_pujas))
        .route("/api/catalog/pujas/:id", get(handlers::catalog::get_puja))
        .route("/api/catalog/quote", get(handlers::catalog::quote))
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route("/api/bookings", get(handlers::bookings::list_bookings))
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route("/api/admin/bookings", get(handlers::admin::get_bookings))
        .route("/api/admin/bookings", post(handlers::admin::create_booking))
        .route(
            "/api/admin/bookings/:id/verify",
            post(handlers::admin::verify_booking),
        )
        .route(
            "/api/admin/bookings/:id/complete",
            post(handlers::admin::complete_booking),
        )
        .route("/api/admin/agents", get(handlers::admin::get_agents))
        .route("/api/admin/agents", post(handlers::admin::create_agent))
        .route("/api/admin/clients", post(handlers::admin::seed_client))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
