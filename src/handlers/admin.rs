use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Agent, Booking};
use crate::services::checkout::{self, AdminCreateRequest};
use crate::services::verification::{self, VerifyAssignRequest};
use crate::state::AppState;

use super::clients::{self, RegisterRequest, RegisterResponse};

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let db = state.db.lock().unwrap();
    let bookings = queries::get_all_bookings(&db, query.status.as_deref(), limit)
        .map_err(AppError::Database)?;
    Ok(Json(bookings))
}

// POST /api/admin/bookings — audited staff override, distinct from checkout
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<AdminCreateRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let booking = {
        let db = state.db.lock().unwrap();
        checkout::admin_create(&db, request)?
    };
    Ok((StatusCode::CREATED, Json(booking)))
}

// POST /api/admin/bookings/:id/verify
pub async fn verify_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<VerifyAssignRequest>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let outcome = {
        let db = state.db.lock().unwrap();
        verification::verify_and_assign(&db, &id, &request)?
    };

    // Email only on the first Pending -> Confirmed edge, and never awaited.
    if outcome.newly_confirmed {
        verification::notify_confirmation(&state, &outcome.booking);
    }

    Ok(Json(outcome.booking))
}

// POST /api/admin/bookings/:id/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db.lock().unwrap();
    let booking = verification::mark_completed(&db, &id)?;
    Ok(Json(booking))
}

// GET /api/admin/agents
#[derive(Deserialize)]
pub struct AgentsQuery {
    // Selection convenience for the assignment UI, not an enforced constraint.
    pub location_id: Option<String>,
}

pub async fn get_agents(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AgentsQuery>,
) -> Result<Json<Vec<Agent>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db.lock().unwrap();
    let agents =
        queries::get_agents(&db, query.location_id.as_deref()).map_err(AppError::Database)?;
    Ok(Json(agents))
}

// POST /api/admin/agents
#[derive(Deserialize)]
pub struct CreateAgentRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location_id: String,
}

pub async fn create_agent(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateAgentRequest>,
) -> Result<(StatusCode, Json<Agent>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if request.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }

    let agent = Agent {
        id: Uuid::new_v4().to_string(),
        name: request.name.trim().to_string(),
        email: request.email.trim().to_lowercase(),
        phone: request.phone.trim().to_string(),
        location_id: request.location_id,
        created_at: Utc::now().naive_utc(),
    };

    {
        let db = state.db.lock().unwrap();
        queries::get_location_by_id(&db, &agent.location_id)
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound(format!("location {}", agent.location_id)))?;
        queries::insert_agent(&db, &agent).map_err(AppError::Database)?;
    }

    Ok((StatusCode::CREATED, Json(agent)))
}

// POST /api/admin/clients — staff-seeded account
pub async fn seed_client(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let client = clients::create_client(&state, request)?;
    clients::send_welcome(&state, client.email.clone(), client.name.clone());

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: client.id,
            name: client.name,
            email: client.email,
            api_token: client.api_token,
        }),
    ))
}
