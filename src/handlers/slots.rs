use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::AppError;
use crate::services::scheduling::{day_slots, DaySlots};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SlotsQuery {
    /// Provider-local date.
    date: NaiveDate,
}

// GET /api/providers/:id/slots?date=YYYY-MM-DD
pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<DaySlots>, AppError> {
    let day = day_slots(state.store.as_ref(), &id, query.date).await?;
    Ok(Json(day))
}
