use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};

use super::{AppointmentFilter, BookingStore, MarketplaceRecords, StoreError};
use crate::models::{Appointment, AppointmentStatus, Availability, NewAppointment, Provider};

#[derive(Default)]
struct Tables {
    providers: HashMap<String, Provider>,
    appointments: Vec<Appointment>,
}

/// Process-local store with the same uniqueness contract as the database:
/// the conflict check and the insert happen under one lock.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn availability(&self, provider_id: &str) -> Result<Option<Availability>, StoreError> {
        let tables = self.tables()?;
        tables
            .providers
            .get(provider_id)
            .map(|p| p.availability.clone())
            .ok_or_else(|| StoreError::NotFound(format!("provider {provider_id}")))
    }

    async fn taken_times(
        &self,
        provider_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<NaiveDateTime>, StoreError> {
        let tables = self.tables()?;
        let mut times: Vec<NaiveDateTime> = tables
            .appointments
            .iter()
            .filter(|a| {
                a.provider_id == provider_id && a.status.occupies_slot() && a.date() == date
            })
            .map(|a| a.scheduled_at)
            .collect();
        times.sort();
        Ok(times)
    }

    async fn insert_appointment(&self, new: NewAppointment) -> Result<Appointment, StoreError> {
        let mut tables = self.tables()?;

        if !tables.providers.contains_key(&new.provider_id) {
            return Err(StoreError::NotFound("provider".to_string()));
        }

        let clash = tables.appointments.iter().any(|a| {
            a.provider_id == new.provider_id
                && a.scheduled_at == new.scheduled_at
                && a.status.occupies_slot()
        });
        if clash {
            return Err(StoreError::UniqueViolation);
        }

        let now = Utc::now().naive_utc();
        let appointment = Appointment {
            id: uuid::Uuid::new_v4().to_string(),
            consumer_id: new.consumer_id,
            provider_id: new.provider_id,
            service_id: new.service_id,
            status: AppointmentStatus::Pending,
            scheduled_at: new.scheduled_at,
            created_at: now,
            updated_at: now,
        };
        tables.appointments.push(appointment.clone());
        Ok(appointment)
    }

    async fn update_status(
        &self,
        id: &str,
        expected: AppointmentStatus,
        next: AppointmentStatus,
    ) -> Result<Appointment, StoreError> {
        let mut tables = self.tables()?;
        let appointment = tables
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("appointment {id}")))?;

        if appointment.status != expected {
            return Err(StoreError::StatusChanged {
                current: appointment.status,
            });
        }

        appointment.status = next;
        appointment.updated_at = Utc::now().naive_utc();
        Ok(appointment.clone())
    }
}

#[async_trait]
impl MarketplaceRecords for InMemoryStore {
    async fn save_provider(&self, provider: &Provider) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        tables
            .providers
            .insert(provider.id.clone(), provider.clone());
        Ok(())
    }

    async fn provider(&self, id: &str) -> Result<Option<Provider>, StoreError> {
        let tables = self.tables()?;
        Ok(tables.providers.get(id).cloned())
    }

    async fn appointments_for(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError> {
        let tables = self.tables()?;
        let mut appointments: Vec<Appointment> = tables
            .appointments
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        appointments.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at));
        Ok(appointments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    async fn store_with_provider() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .save_provider(&Provider {
                id: "prov-1".to_string(),
                display_name: "Sam".to_string(),
                availability: None,
            })
            .await
            .unwrap();
        store
    }

    fn new_appt(consumer: &str, at: &str) -> NewAppointment {
        NewAppointment {
            consumer_id: consumer.to_string(),
            provider_id: "prov-1".to_string(),
            service_id: "svc-1".to_string(),
            scheduled_at: dt(at),
        }
    }

    #[tokio::test]
    async fn test_duplicate_slot_rejected() {
        let store = store_with_provider().await;
        store.insert_appointment(new_appt("alice", "2025-06-16 10:00")).await.unwrap();
        let err = store
            .insert_appointment(new_appt("bob", "2025-06-16 10:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation));
    }

    #[tokio::test]
    async fn test_cancelled_slot_released() {
        let store = store_with_provider().await;
        let first = store.insert_appointment(new_appt("alice", "2025-06-16 10:00")).await.unwrap();
        store
            .update_status(&first.id, AppointmentStatus::Pending, AppointmentStatus::Cancelled)
            .await
            .unwrap();
        assert!(store.insert_appointment(new_appt("bob", "2025-06-16 10:00")).await.is_ok());

        let date = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        assert_eq!(store.taken_times("prov-1", date).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.availability("nobody").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.insert_appointment(new_appt("alice", "2025-06-16 10:00")).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stale_status_update() {
        let store = store_with_provider().await;
        let appt = store.insert_appointment(new_appt("alice", "2025-06-16 10:00")).await.unwrap();
        store
            .update_status(&appt.id, AppointmentStatus::Pending, AppointmentStatus::Confirmed)
            .await
            .unwrap();
        let err = store
            .update_status(&appt.id, AppointmentStatus::Pending, AppointmentStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::StatusChanged {
                current: AppointmentStatus::Confirmed
            }
        ));
    }
}
