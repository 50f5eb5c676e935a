use std::fmt;
use std::ops::Range;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("invalid slot label: {0}")]
    InvalidLabel(String),

    #[error("slots start on the hour: {0}")]
    NotOnTheHour(String),
}

/// Half-open range of whole hours, `[start, end)`. Only built through
/// [`HourRange::new`], so `start < end <= 24` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourRange {
    start: u32,
    end: u32,
}

impl HourRange {
    /// 8:00 AM through 7:00 PM.
    pub const DEFAULT: HourRange = HourRange { start: 8, end: 20 };

    /// Returns `None` unless `start < end <= 24`.
    pub fn new(start: u32, end: u32) -> Option<Self> {
        if start < end && end <= 24 {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn contains(&self, hour: u32) -> bool {
        hour >= self.start && hour < self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Labels for every hour in the range, earliest first. A clone of the
    /// iterator continues from where the original is; call `slots()` again
    /// to start over.
    pub fn slots(&self) -> Slots {
        Slots {
            hours: self.start..self.end,
        }
    }
}

impl Default for HourRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl IntoIterator for HourRange {
    type Item = String;
    type IntoIter = Slots;

    fn into_iter(self) -> Slots {
        self.slots()
    }
}

#[derive(Debug, Clone)]
pub struct Slots {
    hours: Range<u32>,
}

impl Iterator for Slots {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.hours.next().map(format_label)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.hours.size_hint()
    }
}

impl DoubleEndedIterator for Slots {
    fn next_back(&mut self) -> Option<String> {
        self.hours.next_back().map(format_label)
    }
}

impl ExactSizeIterator for Slots {}

/// Formats a 24-hour clock hour as a picker label, e.g. `13` -> `"1:00 PM"`.
pub fn format_label(hour: u32) -> String {
    let hour = hour % 24;
    let meridiem = if hour < 12 { "AM" } else { "PM" };
    let display = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{display}:00 {meridiem}")
}

/// Inverse of [`format_label`].
pub fn parse_label(label: &str) -> Result<u32, SlotError> {
    let (hour, minute) = parse_clock(label).ok_or_else(|| SlotError::InvalidLabel(label.to_string()))?;
    if minute != 0 {
        return Err(SlotError::NotOnTheHour(label.to_string()));
    }
    Ok(hour)
}

/// Converts a picker label to the `HH:MM` form stored alongside the date.
pub fn label_to_24h(label: &str) -> Result<String, SlotError> {
    let hour = parse_label(label)?;
    Ok(format!("{hour:02}:00"))
}

/// Combines a calendar date and a slot label into the stored timestamp.
pub fn slot_datetime(date: NaiveDate, label: &str) -> Result<NaiveDateTime, SlotError> {
    let hhmm = label_to_24h(label)?;
    let time = NaiveTime::parse_from_str(&hhmm, "%H:%M")
        .map_err(|_| SlotError::InvalidLabel(label.to_string()))?;
    Ok(date.and_time(time))
}

/// Label for the slot a stored timestamp occupies.
pub fn label_for(dt: &NaiveDateTime) -> String {
    format_label(dt.hour())
}

/// Parses a wall-clock time written either as `"9:00 AM"` or `"17:30"` into
/// `(hour, minute)` on the 24-hour clock.
pub(crate) fn parse_clock(s: &str) -> Option<(u32, u32)> {
    let s = s.trim();
    let (time, meridiem) = match s.split_once(' ') {
        Some((time, meridiem)) => (time, Some(meridiem.trim().to_ascii_uppercase())),
        None => (s, None),
    };

    let (h, m) = time.split_once(':')?;
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    if minute > 59 {
        return None;
    }

    let hour = match meridiem.as_deref() {
        None if hour <= 23 => hour,
        Some("AM") if (1..=12).contains(&hour) => hour % 12,
        Some("PM") if (1..=12).contains(&hour) => hour % 12 + 12,
        _ => return None,
    };
    Some((hour, minute))
}

/// One slot as shown in the picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    pub label: String,
    pub taken: bool,
}

impl fmt::Display for SlotView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.taken {
            write!(f, "{} (taken)", self.label)
        } else {
            write!(f, "{}", self.label)
        }
    }
}
