use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Client;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Bearer credential for the booking endpoints.
    pub api_token: String,
}

// POST /api/clients/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let client = create_client(&state, request)?;

    send_welcome(&state, client.email.clone(), client.name.clone());

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

pub fn create_client(state: &Arc<AppState>, request: RegisterRequest) -> Result<Client, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    if !request.email.contains('@') {
        return Err(AppError::Validation("a valid email is required".to_string()));
    }
    if request.phone.trim().is_empty() {
        return Err(AppError::Validation("phone is required".to_string()));
    }

    let client = Client {
        id: Uuid::new_v4().to_string(),
        name: request.name.trim().to_string(),
        email: request.email.trim().to_lowercase(),
        phone: request.phone.trim().to_string(),
        address: request.address,
        api_token: Uuid::new_v4().to_string(),
        created_at: Utc::now().naive_utc(),
    };

    {
        let db = state.db.lock().unwrap();
        let existing =
            queries::get_client_by_email(&db, &client.email).map_err(AppError::Database)?;
        if existing.is_some() {
            return Err(AppError::Conflict(format!(
                "email {} is already registered",
                client.email
            )));
        }
        queries::insert_client(&db, &client).map_err(AppError::Database)?;
    }

    tracing::info!(client_id = %client.id, "client registered");
    Ok(client)
}

pub fn send_welcome(state: &Arc<AppState>, to: String, name: String) {
    let state = Arc::clone(state);
    tokio::spawn(async move {
        if let Err(e) = state.notifier.send_welcome(&to, &name).await {
            tracing::error!(error = %e, "failed to send welcome email");
        }
    });
}
