use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::slot::{format_label, parse_label, slot_datetime};
use crate::models::{Actor, Appointment, AppointmentStatus, NewAppointment, SlotError, WeeklySchedule};
use crate::store::{BookingStore, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub consumer_id: String,
    pub provider_id: String,
    pub service_id: String,
    /// Provider-local calendar date.
    pub date: NaiveDate,
    /// Picker label, e.g. `"2:00 PM"`.
    pub slot: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("That time slot was just booked. Please choose another time.")]
    SlotTaken,

    #[error("That date has already passed.")]
    PastDate,

    #[error("That time is outside the provider's hours. Available: {hours}")]
    OutsideAvailability { hours: String },

    #[error(transparent)]
    InvalidSlot(#[from] SlotError),

    #[error("provider not found")]
    ProviderNotFound,

    #[error("appointment not found")]
    AppointmentNotFound,

    #[error("cannot change appointment from {} to {}", .from.as_str(), .to.as_str())]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("appointment is already {}", .current.as_str())]
    StatusChanged { current: AppointmentStatus },

    #[error("booking failed: {0}")]
    Store(StoreError),
}

/// Writes a pending appointment for the requested slot.
///
/// The store's uniqueness guarantee is the only conflict check that counts;
/// of two racing requests for the same slot exactly one gets through and the
/// other sees [`BookingError::SlotTaken`]. A retry after an unknown outcome
/// lands in the same place, so retrying is safe.
///
/// `today` is the provider-local current date; earlier dates are refused.
pub async fn book<S>(
    store: &S,
    req: &BookingRequest,
    today: NaiveDate,
) -> Result<Appointment, BookingError>
where
    S: BookingStore + ?Sized,
{
    let hour = parse_label(&req.slot)?;
    if req.date < today {
        return Err(BookingError::PastDate);
    }

    let availability = store
        .availability(&req.provider_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => BookingError::ProviderNotFound,
            e => BookingError::Store(e),
        })?;

    let schedule = WeeklySchedule::new(availability.as_ref());
    let range = schedule.hour_range();
    if !schedule.is_date_bookable(req.date) || !range.contains(hour) {
        let hours = match &availability {
            Some(avail) => avail.to_human_readable(),
            None => format!(
                "every day, {}-{}",
                format_label(range.start()),
                format_label(range.end())
            ),
        };
        return Err(BookingError::OutsideAvailability { hours });
    }

    let scheduled_at = slot_datetime(req.date, &req.slot)?;
    let new = NewAppointment {
        consumer_id: req.consumer_id.clone(),
        provider_id: req.provider_id.clone(),
        service_id: req.service_id.clone(),
        scheduled_at,
    };

    match store.insert_appointment(new).await {
        Ok(appointment) => {
            tracing::info!(
                appointment_id = %appointment.id,
                provider_id = %appointment.provider_id,
                %scheduled_at,
                "appointment booked"
            );
            Ok(appointment)
        }
        Err(StoreError::UniqueViolation) => {
            tracing::info!(provider_id = %req.provider_id, %scheduled_at, "slot already taken");
            Err(BookingError::SlotTaken)
        }
        Err(StoreError::NotFound(_)) => Err(BookingError::ProviderNotFound),
        Err(e) => {
            tracing::error!(provider_id = %req.provider_id, error = %e, "failed to write appointment");
            Err(BookingError::Store(e))
        }
    }
}

/// Moves an appointment along its lifecycle. Nothing is written unless the
/// transition is allowed for `actor` and the row is still in `from`.
pub async fn update_status<S>(
    store: &S,
    id: &str,
    actor: Actor,
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<Appointment, BookingError>
where
    S: BookingStore + ?Sized,
{
    if !from.can_transition(to, actor) {
        return Err(BookingError::InvalidTransition { from, to });
    }

    let appointment = store.update_status(id, from, to).await.map_err(|e| match e {
        StoreError::NotFound(_) => BookingError::AppointmentNotFound,
        StoreError::StatusChanged { current } => BookingError::StatusChanged { current },
        e => BookingError::Store(e),
    })?;

    tracing::info!(
        appointment_id = id,
        from = from.as_str(),
        to = to.as_str(),
        ?actor,
        "appointment status updated"
    );
    Ok(appointment)
}
