use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, PaymentMethod, PaymentStatus};
use crate::services::pricing::{self, CatalogSelector};
use crate::state::AppState;

/// Explicit caller identity, resolved from the bearer token by the handler.
/// Nothing in the checkout path reads ambient session state.
pub struct AuthContext {
    pub client_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(flatten)]
    pub selector: CatalogSelector,
    pub payment_method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub payment_details: Option<String>,
    pub coupon_code: Option<String>,
    pub booking_date: NaiveDate,
}

/// Client-facing booking creation. The request carries no price field at all;
/// the price is resolved from the catalog here and snapshotted onto the
/// booking, and the booking always starts Pending and unverified.
pub async fn checkout(
    state: &Arc<AppState>,
    auth: &AuthContext,
    request: CheckoutRequest,
) -> Result<Booking, AppError> {
    let booking_id = Uuid::new_v4().to_string();

    // Resolve everything we need from the store before any await; the
    // connection mutex must not be held across the gateway call.
    let (base_price, coupon) = {
        let db = state.db.lock().unwrap();

        queries::get_client_by_id(&db, &auth.client_id)
            .map_err(AppError::Database)?
            .ok_or(AppError::Unauthorized)?;

        let base = pricing::resolve_price(&db, &request.selector)?;

        let coupon = match &request.coupon_code {
            Some(code) => Some(
                queries::get_coupon_by_code(&db, code)
                    .map_err(AppError::Database)?
                    .ok_or_else(|| AppError::NotFound(format!("coupon {code}")))?,
            ),
            None => None,
        };

        (base, coupon)
    };

    let discount = match &coupon {
        Some(c) => pricing::apply_coupon(c, base_price)?,
        None => 0,
    };
    let price = base_price - discount;

    let transaction_id = match request.payment_method {
        PaymentMethod::Qr => {
            let reference = request
                .transaction_id
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .ok_or_else(|| {
                    AppError::Validation(
                        "a transaction reference is required for QR transfers".to_string(),
                    )
                })?;
            Some(reference.to_string())
        }
        PaymentMethod::Razorpay => {
            let amount = pricing::quote_total(price, PaymentMethod::Razorpay);
            let provider_txn = state
                .payments
                .authorize(amount, &booking_id)
                .await
                .map_err(|e| {
                    tracing::warn!(error = %e, booking_id = %booking_id, "gateway authorization failed");
                    AppError::PaymentGateway(e.to_string())
                })?;
            Some(provider_txn)
        }
    };

    let (service_id, location_id, puja_id) = match &request.selector {
        CatalogSelector::Service {
            service_id,
            location_id,
            ..
        } => (Some(service_id.clone()), Some(location_id.clone()), None),
        CatalogSelector::Puja { puja_id, .. } => (None, None, Some(puja_id.clone())),
    };
    let tier_name = match &request.selector {
        CatalogSelector::Service { tier, .. } => tier.clone(),
        CatalogSelector::Puja { package, .. } => package.clone(),
    };

    let now = Utc::now().naive_utc();
    let booking = Booking {
        id: booking_id,
        client_id: auth.client_id.clone(),
        service_id,
        location_id,
        puja_id,
        tier_name,
        price,
        payment_method: request.payment_method,
        transaction_id,
        payment_details: request.payment_details,
        is_payment_verified: false,
        payment_status: PaymentStatus::Pending,
        agent_id: None,
        status: BookingStatus::Pending,
        booking_date: request.booking_date,
        created_at: now,
        updated_at: now,
        version: 0,
    };

    {
        let db = state.db.lock().unwrap();
        queries::create_booking(&db, &booking).map_err(AppError::Database)?;
        if let Some(c) = &coupon {
            queries::record_redemption(&db, &c.id, &booking.id, discount)
                .map_err(AppError::Database)?;
        }
    }

    tracing::info!(
        booking_id = %booking.id,
        client_id = %booking.client_id,
        price = booking.price,
        method = booking.payment_method.as_str(),
        "booking created"
    );

    Ok(booking)
}

#[derive(Debug, Deserialize)]
pub struct AdminCreateRequest {
    pub client_id: String,
    #[serde(flatten)]
    pub selector: CatalogSelector,
    /// Operator-entered price; the staff form is a different trust boundary
    /// than the public checkout.
    pub price: i64,
    pub payment_method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub payment_details: Option<String>,
    pub booking_date: NaiveDate,
    #[serde(default)]
    pub is_payment_verified: bool,
    pub agent_id: Option<String>,
    /// Explicit override: create the booking already delivered, bypassing
    /// the verify-and-assign gate.
    #[serde(default)]
    pub completed: bool,
}

/// Staff-only booking creation. Status still derives from the two-factor
/// rule unless the `completed` override is set, and every use is audited.
pub fn admin_create(
    conn: &rusqlite::Connection,
    request: AdminCreateRequest,
) -> Result<Booking, AppError> {
    queries::get_client_by_id(conn, &request.client_id)
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound(format!("client {}", request.client_id)))?;

    if let Some(agent_id) = &request.agent_id {
        queries::get_agent_by_id(conn, agent_id)
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound(format!("agent {agent_id}")))?;
    }

    let status = if request.completed {
        BookingStatus::Completed
    } else if request.is_payment_verified && request.agent_id.is_some() {
        BookingStatus::Confirmed
    } else {
        BookingStatus::Pending
    };

    let (service_id, location_id, puja_id, tier_name) = match &request.selector {
        CatalogSelector::Service {
            service_id,
            location_id,
            tier,
        } => (
            Some(service_id.clone()),
            Some(location_id.clone()),
            None,
            tier.clone(),
        ),
        CatalogSelector::Puja { puja_id, package } => {
            (None, None, Some(puja_id.clone()), package.clone())
        }
    };

    let now = Utc::now().naive_utc();
    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        client_id: request.client_id,
        service_id,
        location_id,
        puja_id,
        tier_name,
        price: request.price,
        payment_method: request.payment_method,
        transaction_id: request.transaction_id,
        payment_details: request.payment_details,
        is_payment_verified: request.is_payment_verified,
        payment_status: PaymentStatus::from_verified(request.is_payment_verified),
        agent_id: request.agent_id,
        status,
        booking_date: request.booking_date,
        created_at: now,
        updated_at: now,
        version: 0,
    };

    queries::create_booking(conn, &booking).map_err(AppError::Database)?;

    tracing::warn!(
        booking_id = %booking.id,
        client_id = %booking.client_id,
        price = booking.price,
        status = booking.status.as_str(),
        verified = booking.is_payment_verified,
        "administrative booking override used"
    );

    Ok(booking)
}
