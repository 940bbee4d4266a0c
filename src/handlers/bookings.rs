use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Booking;
use crate::services::checkout::{self, AuthContext, CheckoutRequest};
use crate::state::AppState;

/// Resolves the bearer token to a client identity. Checkout and booking
/// reads take this explicit context instead of ambient session state.
fn client_auth(state: &Arc<AppState>, headers: &HeaderMap) -> Result<AuthContext, AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() {
        return Err(AppError::Unauthorized);
    }

    let db = state.db.lock().unwrap();
    let client = queries::get_client_by_token(&db, token)
        .map_err(AppError::Database)?
        .ok_or(AppError::Unauthorized)?;

    Ok(AuthContext {
        client_id: client.id,
    })
}

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let auth = client_auth(&state, &headers)?;
    let booking = checkout::checkout(&state, &auth, request).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /api/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Booking>>, AppError> {
    let auth = client_auth(&state, &headers)?;

    let db = state.db.lock().unwrap();
    let bookings =
        queries::get_bookings_for_client(&db, &auth.client_id).map_err(AppError::Database)?;
    Ok(Json(bookings))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let auth = client_auth(&state, &headers)?;

    let db = state.db.lock().unwrap();
    let booking = queries::get_booking_by_id(&db, &id)
        .map_err(AppError::Database)?
        // Another client's booking reads as absent, not forbidden.
        .filter(|b| b.client_id == auth.client_id)
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    Ok(Json(booking))
}
