use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::models::slot::label_for;
use crate::store::{BookingStore, StoreError};

/// Labels of slots already held by a non-cancelled appointment on `date`.
///
/// Advisory only: the result may be stale by the time a booking is submitted.
pub async fn taken_slots<S>(
    store: &S,
    provider_id: &str,
    date: NaiveDate,
) -> Result<BTreeSet<String>, StoreError>
where
    S: BookingStore + ?Sized,
{
    let times = store.taken_times(provider_id, date).await?;
    Ok(times.iter().map(label_for).collect())
}

/// Like [`taken_slots`], but a failed read is treated as "nothing taken" so
/// that the picker stays usable. The write path still rejects conflicts.
pub async fn taken_slots_or_empty<S>(store: &S, provider_id: &str, date: NaiveDate) -> BTreeSet<String>
where
    S: BookingStore + ?Sized,
{
    match taken_slots(store, provider_id, date).await {
        Ok(taken) => taken,
        Err(e) => {
            tracing::warn!(provider_id, %date, error = %e, "taken-slot lookup failed, assuming none taken");
            BTreeSet::new()
        }
    }
}
