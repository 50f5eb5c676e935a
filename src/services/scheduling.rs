use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Availability, SlotView, WeeklySchedule};
use crate::services::conflicts::taken_slots_or_empty;
use crate::store::{BookingStore, StoreError};

/// What the picker shows for one provider on one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySlots {
    pub date: NaiveDate,
    pub bookable: bool,
    pub slots: Vec<SlotView>,
}

/// Candidate slots for `date`, each flagged if it is already taken.
pub fn mark_slots<I>(
    availability: Option<&Availability>,
    date: NaiveDate,
    taken: I,
) -> DaySlots
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let schedule = WeeklySchedule::new(availability);
    let Some(labels) = schedule.slots_on(date) else {
        return DaySlots {
            date,
            bookable: false,
            slots: vec![],
        };
    };

    let taken: Vec<String> = taken.into_iter().map(|t| t.as_ref().to_string()).collect();
    let slots = labels
        .map(|label| SlotView {
            taken: taken.contains(&label),
            label,
        })
        .collect();

    DaySlots {
        date,
        bookable: true,
        slots,
    }
}

/// Loads availability and taken slots and builds the picker for `date`.
/// Only an unknown provider is an error; a failed taken-slot read shows
/// every slot as free.
pub async fn day_slots<S>(store: &S, provider_id: &str, date: NaiveDate) -> Result<DaySlots, StoreError>
where
    S: BookingStore + ?Sized,
{
    let availability = store.availability(provider_id).await?;

    if !WeeklySchedule::new(availability.as_ref()).is_date_bookable(date) {
        return Ok(mark_slots(availability.as_ref(), date, Vec::<String>::new()));
    }

    let taken = taken_slots_or_empty(store, provider_id, date).await;
    tracing::debug!(provider_id, %date, taken = taken.len(), "computed day slots");

    Ok(mark_slots(availability.as_ref(), date, taken))
}
