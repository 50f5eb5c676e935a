use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Local;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{Actor, Appointment, AppointmentStatus};
use crate::services::booking::{self, BookingRequest};
use crate::state::AppState;
use crate::store::{AppointmentFilter, MarketplaceRecords};

// POST /api/appointments
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let today = Local::now().date_naive();
    let appointment = booking::book(state.store.as_ref(), &req, today).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

// POST /api/appointments/:id/status
#[derive(Deserialize)]
pub struct StatusChange {
    actor: Actor,
    from: AppointmentStatus,
    to: AppointmentStatus,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(change): Json<StatusChange>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = booking::update_status(
        state.store.as_ref(),
        &id,
        change.actor,
        change.from,
        change.to,
    )
    .await?;
    Ok(Json(appointment))
}

// GET /api/appointments?consumer_id=..|provider_id=..
#[derive(Deserialize)]
pub struct ListQuery {
    consumer_id: Option<String>,
    provider_id: Option<String>,
}

pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let filter = match (query.consumer_id, query.provider_id) {
        (Some(id), None) => AppointmentFilter::Consumer(id),
        (None, Some(id)) => AppointmentFilter::Provider(id),
        _ => {
            return Err(AppError::BadRequest(
                "pass exactly one of consumer_id or provider_id".to_string(),
            ))
        }
    };

    let appointments = state.store.appointments_for(&filter).await?;
    Ok(Json(appointments))
}
