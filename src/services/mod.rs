pub mod booking;
pub mod conflicts;
pub mod scheduling;
pub mod session;
