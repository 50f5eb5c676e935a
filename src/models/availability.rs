use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::slot::{parse_clock, HourRange, Slots};

/// A provider's recurring weekly hours, as saved from the profile page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    /// Weekdays, Sunday = 0.
    pub days: Vec<u8>,
    pub start_time: String,
    pub end_time: String,
}

impl Availability {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let availability: Availability = serde_json::from_str(s)?;
        availability.validate()
    }

    /// Checks the weekday list and normalizes it. Unparseable times are
    /// accepted here and fall back to default hours when read.
    pub fn validate(mut self) -> anyhow::Result<Self> {
        if let Some(day) = self.days.iter().find(|d| **d > 6) {
            return Err(anyhow::anyhow!("invalid weekday: {day}"));
        }
        self.days.sort_unstable();
        self.days.dedup();
        Ok(self)
    }

    /// Recovers a stored value that [`Availability::from_json`] rejected.
    /// Valid weekdays are kept and the rest dropped, so a bad row never opens
    /// more days than it named. Times that can't be read fall back to the
    /// default hours.
    pub fn from_json_lossy(s: &str) -> Self {
        let value: serde_json::Value = serde_json::from_str(s).unwrap_or_default();

        let mut days: Vec<u8> = value
            .get("days")
            .and_then(|d| d.as_array())
            .map(|days| {
                days.iter()
                    .filter_map(|d| d.as_u64())
                    .filter(|d| *d <= 6)
                    .map(|d| d as u8)
                    .collect()
            })
            .unwrap_or_default();
        days.sort_unstable();
        days.dedup();

        let time = |key: &str| {
            value
                .get(key)
                .and_then(|t| t.as_str())
                .unwrap_or_default()
                .to_string()
        };

        Self {
            days,
            start_time: time("startTime"),
            end_time: time("endTime"),
        }
    }

    pub fn to_human_readable(&self) -> String {
        let names = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
        let days = self
            .days
            .iter()
            .filter_map(|d| names.get(*d as usize))
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        format!("{days}: {}-{}", self.start_time, self.end_time)
    }
}

/// Booking-side view of a provider's optional availability.
#[derive(Debug, Clone, Copy)]
pub struct WeeklySchedule<'a> {
    availability: Option<&'a Availability>,
}

impl<'a> WeeklySchedule<'a> {
    pub fn new(availability: Option<&'a Availability>) -> Self {
        Self { availability }
    }

    /// `weekday` counts from Sunday = 0. No availability means every day.
    pub fn is_day_bookable(&self, weekday: u8) -> bool {
        match self.availability {
            Some(avail) => avail.days.contains(&weekday),
            None => weekday <= 6,
        }
    }

    pub fn is_date_bookable(&self, date: NaiveDate) -> bool {
        self.is_day_bookable(date.weekday().num_days_from_sunday() as u8)
    }

    /// Daily hours on the 24-hour clock. Missing, unparseable or inverted
    /// times yield [`HourRange::DEFAULT`], never an empty range.
    pub fn hour_range(&self) -> HourRange {
        let Some(avail) = self.availability else {
            return HourRange::DEFAULT;
        };

        let start = parse_clock(&avail.start_time).map(|(h, _)| h);
        let end = parse_clock(&avail.end_time).map(|(h, _)| h);

        match (start, end) {
            (Some(start), Some(end)) => HourRange::new(start, end).unwrap_or_else(|| {
                tracing::debug!(
                    start = %avail.start_time,
                    end = %avail.end_time,
                    "availability start is not before end, using default hours"
                );
                HourRange::DEFAULT
            }),
            _ => {
                tracing::debug!(
                    start = %avail.start_time,
                    end = %avail.end_time,
                    "unparseable availability times, using default hours"
                );
                HourRange::DEFAULT
            }
        }
    }

    /// Slots offered on `date`, or `None` when the provider doesn't work that day.
    pub fn slots_on(&self, date: NaiveDate) -> Option<Slots> {
        self.is_date_bookable(date).then(|| self.hour_range().slots())
    }
}
