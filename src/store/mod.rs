pub mod inmemory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{Appointment, AppointmentStatus, Availability, NewAppointment, Provider};

pub use inmemory::InMemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another non-cancelled appointment already holds this provider/time.
    #[error("an active appointment already holds this provider and time")]
    UniqueViolation,

    #[error("not found: {0}")]
    NotFound(String),

    /// Compare-and-set lost: the row is no longer in the expected status.
    #[error("appointment is now {}", .current.as_str())]
    StatusChanged { current: AppointmentStatus },

    #[error("database error: {0}")]
    Database(rusqlite::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("store lock poisoned")]
    Poisoned,
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref err, _) = e {
            match err.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => return StoreError::UniqueViolation,
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return StoreError::NotFound("provider".to_string())
                }
                _ => {}
            }
        }
        StoreError::Database(e)
    }
}

/// The storage operations the booking flow depends on.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// `Ok(None)` means the provider exists but never set availability.
    async fn availability(&self, provider_id: &str) -> Result<Option<Availability>, StoreError>;

    /// Start times of non-cancelled appointments on the provider's local `date`.
    async fn taken_times(
        &self,
        provider_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<NaiveDateTime>, StoreError>;

    /// Inserts a pending appointment. Must fail with
    /// [`StoreError::UniqueViolation`] if a non-cancelled appointment already
    /// exists for the same provider and `scheduled_at`.
    async fn insert_appointment(&self, new: NewAppointment) -> Result<Appointment, StoreError>;

    /// Sets `next` only if the row is still `expected`.
    async fn update_status(
        &self,
        id: &str,
        expected: AppointmentStatus,
        next: AppointmentStatus,
    ) -> Result<Appointment, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppointmentFilter {
    Consumer(String),
    Provider(String),
}

impl AppointmentFilter {
    pub fn matches(&self, appt: &Appointment) -> bool {
        match self {
            AppointmentFilter::Consumer(id) => appt.consumer_id == *id,
            AppointmentFilter::Provider(id) => appt.provider_id == *id,
        }
    }
}

/// Profile and listing records around the booking flow.
#[async_trait]
pub trait MarketplaceRecords: Send + Sync {
    async fn save_provider(&self, provider: &Provider) -> Result<(), StoreError>;

    async fn provider(&self, id: &str) -> Result<Option<Provider>, StoreError>;

    /// Newest first.
    async fn appointments_for(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError>;
}

pub trait Store: BookingStore + MarketplaceRecords {}

impl<T: BookingStore + MarketplaceRecords> Store for T {}
