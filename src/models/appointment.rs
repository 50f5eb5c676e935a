use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub consumer_id: String,
    pub provider_id: String,
    pub service_id: String,
    pub status: AppointmentStatus,
    /// Provider-local wall-clock time.
    pub scheduled_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Insert payload. New appointments always start out pending.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub consumer_id: String,
    pub provider_id: String,
    pub service_id: String,
    pub scheduled_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

/// Who is asking for a status change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Consumer,
    Provider,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AppointmentStatus::Pending),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    /// Whether the slot is still held.
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }

    pub fn can_transition(&self, next: AppointmentStatus, actor: Actor) -> bool {
        use AppointmentStatus::*;
        match (self, next) {
            (Pending, Confirmed) => actor == Actor::Provider,
            (Confirmed, Completed) => actor == Actor::Provider,
            (Pending, Cancelled) | (Confirmed, Cancelled) => true,
            _ => false,
        }
    }
}

impl Appointment {
    pub fn date(&self) -> NaiveDate {
        self.scheduled_at.date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    const ALL: [AppointmentStatus; 4] = [Pending, Confirmed, Completed, Cancelled];

    #[test]
    fn test_status_round_trip() {
        for status in ALL {
            assert_eq!(AppointmentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AppointmentStatus::parse("rescheduled"), None);
    }

    #[test]
    fn test_provider_transitions() {
        assert!(Pending.can_transition(Confirmed, Actor::Provider));
        assert!(Confirmed.can_transition(Completed, Actor::Provider));
        assert!(Pending.can_transition(Cancelled, Actor::Provider));
        assert!(Confirmed.can_transition(Cancelled, Actor::Provider));
        assert!(!Pending.can_transition(Completed, Actor::Provider));
    }

    #[test]
    fn test_consumer_may_only_cancel() {
        assert!(Pending.can_transition(Cancelled, Actor::Consumer));
        assert!(Confirmed.can_transition(Cancelled, Actor::Consumer));
        assert!(!Pending.can_transition(Confirmed, Actor::Consumer));
        assert!(!Confirmed.can_transition(Completed, Actor::Consumer));
    }

    #[test]
    fn test_terminal_states() {
        for from in [Completed, Cancelled] {
            assert!(from.is_terminal());
            for to in ALL {
                assert!(!from.can_transition(to, Actor::Provider));
                assert!(!from.can_transition(to, Actor::Consumer));
            }
        }
    }

    #[test]
    fn test_no_self_transitions() {
        for status in ALL {
            assert!(!status.can_transition(status, Actor::Provider));
        }
    }

    #[test]
    fn test_occupies_slot() {
        assert!(Pending.occupies_slot());
        assert!(Confirmed.occupies_slot());
        assert!(Completed.occupies_slot());
        assert!(!Cancelled.occupies_slot());
    }
}
