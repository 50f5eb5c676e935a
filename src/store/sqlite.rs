use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use super::{AppointmentFilter, BookingStore, MarketplaceRecords, StoreError};
use crate::db::queries;
use crate::models::{Appointment, AppointmentStatus, Availability, NewAppointment, Provider};

/// SQLite-backed store. The `appointments_active_slot` partial unique index
/// decides which of two racing inserts wins.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn db(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl BookingStore for SqliteStore {
    async fn availability(&self, provider_id: &str) -> Result<Option<Availability>, StoreError> {
        let db = self.db()?;
        queries::get_provider(&db, provider_id)?
            .map(|p| p.availability)
            .ok_or_else(|| StoreError::NotFound(format!("provider {provider_id}")))
    }

    async fn taken_times(
        &self,
        provider_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<NaiveDateTime>, StoreError> {
        let db = self.db()?;
        queries::get_taken_times(&db, provider_id, date)
    }

    async fn insert_appointment(&self, new: NewAppointment) -> Result<Appointment, StoreError> {
        let db = self.db()?;
        queries::insert_appointment(&db, &new)
    }

    async fn update_status(
        &self,
        id: &str,
        expected: AppointmentStatus,
        next: AppointmentStatus,
    ) -> Result<Appointment, StoreError> {
        let db = self.db()?;
        queries::update_appointment_status(&db, id, expected, next)
    }
}

#[async_trait]
impl MarketplaceRecords for SqliteStore {
    async fn save_provider(&self, provider: &Provider) -> Result<(), StoreError> {
        let db = self.db()?;
        queries::save_provider(&db, provider)
    }

    async fn provider(&self, id: &str) -> Result<Option<Provider>, StoreError> {
        let db = self.db()?;
        queries::get_provider(&db, id)
    }

    async fn appointments_for(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError> {
        let db = self.db()?;
        queries::get_appointments(&db, filter)
    }
}
