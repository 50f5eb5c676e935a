use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Availability, Provider};
use crate::state::AppState;
use crate::store::MarketplaceRecords;

// PUT /api/providers/:id
#[derive(Deserialize)]
pub struct ProviderBody {
    display_name: String,
    availability: Option<Availability>,
}

pub async fn put_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ProviderBody>,
) -> Result<Json<Provider>, AppError> {
    let availability = body
        .availability
        .map(Availability::validate)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let provider = Provider {
        id,
        display_name: body.display_name,
        availability,
    };
    state.store.save_provider(&provider).await?;

    tracing::info!(provider_id = %provider.id, "provider saved");
    Ok(Json(provider))
}

// GET /api/providers/:id
#[derive(Serialize)]
pub struct ProviderResponse {
    #[serde(flatten)]
    provider: Provider,
    hours: Option<String>,
}

pub async fn get_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProviderResponse>, AppError> {
    let provider = state
        .store
        .provider(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("provider {id}")))?;

    let hours = provider.availability.as_ref().map(Availability::to_human_readable);
    Ok(Json(ProviderResponse { provider, hours }))
}
