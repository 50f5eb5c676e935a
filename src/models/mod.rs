pub mod appointment;
pub mod availability;
pub mod provider;
pub mod slot;

pub use appointment::{Actor, Appointment, AppointmentStatus, NewAppointment};
pub use availability::{Availability, WeeklySchedule};
pub use provider::Provider;
pub use slot::{HourRange, SlotError, SlotView};
