use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Location, PaymentMethod, Puja, Service};
use crate::services::pricing::{self, CatalogSelector};
use crate::state::AppState;

// GET /api/catalog/services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Service>>, AppError> {
    let db = state.db.lock().unwrap();
    let services = queries::get_all_services(&db).map_err(AppError::Database)?;
    Ok(Json(services))
}

// GET /api/catalog/locations
pub async fn list_locations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Location>>, AppError> {
    let db = state.db.lock().unwrap();
    let locations = queries::get_all_locations(&db).map_err(AppError::Database)?;
    Ok(Json(locations))
}

// GET /api/catalog/locations/:id
pub async fn get_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Location>, AppError> {
    let db = state.db.lock().unwrap();
    let location = queries::get_location_by_id(&db, &id)
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound(format!("location {id}")))?;
    Ok(Json(location))
}

// GET /api/catalog/pujas
pub async fn list_pujas(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Puja>>, AppError> {
    let db = state.db.lock().unwrap();
    let pujas = queries::get_all_pujas(&db).map_err(AppError::Database)?;
    Ok(Json(pujas))
}

// GET /api/catalog/pujas/:id
pub async fn get_puja(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Puja>, AppError> {
    let db = state.db.lock().unwrap();
    let puja = queries::get_puja_by_id(&db, &id)
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound(format!("puja {id}")))?;
    Ok(Json(puja))
}

// GET /api/catalog/quote
#[derive(Deserialize)]
pub struct QuoteQuery {
    pub kind: String,
    pub service_id: Option<String>,
    pub location_id: Option<String>,
    pub puja_id: Option<String>,
    pub tier: Option<String>,
    pub package: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Serialize)]
pub struct QuoteResponse {
    pub base_price: i64,
    pub payment_method: PaymentMethod,
    /// Display figure only; what gets persisted at checkout is the base.
    pub total: i64,
}

pub async fn quote(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<QuoteResponse>, AppError> {
    let selector = match query.kind.as_str() {
        "service" => CatalogSelector::Service {
            service_id: query
                .service_id
                .ok_or_else(|| AppError::Validation("service_id is required".to_string()))?,
            location_id: query
                .location_id
                .ok_or_else(|| AppError::Validation("location_id is required".to_string()))?,
            tier: query
                .tier
                .ok_or_else(|| AppError::Validation("tier is required".to_string()))?,
        },
        "puja" => CatalogSelector::Puja {
            puja_id: query
                .puja_id
                .ok_or_else(|| AppError::Validation("puja_id is required".to_string()))?,
            package: query
                .package
                .ok_or_else(|| AppError::Validation("package is required".to_string()))?,
        },
        other => {
            return Err(AppError::Validation(format!(
                "unknown catalog kind: {other}"
            )))
        }
    };

    let payment_method = query.payment_method.unwrap_or(PaymentMethod::Qr);

    let base_price = {
        let db = state.db.lock().unwrap();
        pricing::resolve_price(&db, &selector)?
    };

    Ok(Json(QuoteResponse {
        base_price,
        payment_method,
        total: pricing::quote_total(base_price, payment_method),
    }))
}
