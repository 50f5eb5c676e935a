use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::booking::BookingError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("storage error: {0}")]
    Store(StoreError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => AppError::NotFound(what),
            e => AppError::Store(e),
        }
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Booking(e) => match e {
                BookingError::SlotTaken => StatusCode::CONFLICT,
                BookingError::StatusChanged { .. } => StatusCode::CONFLICT,
                BookingError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                BookingError::OutsideAvailability { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                BookingError::PastDate => StatusCode::UNPROCESSABLE_ENTITY,
                BookingError::InvalidSlot(_) => StatusCode::BAD_REQUEST,
                BookingError::ProviderNotFound => StatusCode::NOT_FOUND,
                BookingError::AppointmentNotFound => StatusCode::NOT_FOUND,
                BookingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Machine-readable tag for errors clients branch on.
    fn code(&self) -> Option<&'static str> {
        match self {
            AppError::Booking(BookingError::SlotTaken) => Some("slot_taken"),
            AppError::Booking(BookingError::StatusChanged { .. }) => Some("status_changed"),
            AppError::Booking(BookingError::InvalidTransition { .. }) => Some("invalid_transition"),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let mut body = serde_json::json!({ "error": self.to_string() });
        if let Some(code) = self.code() {
            body["code"] = code.into();
        }
        (status, axum::Json(body)).into_response()
    }
}
