//! UTC calendar arithmetic for DCP message times.
//!
//! NOAAPORT DCP messages carry only a day-of-year and time of day, so the
//! year has to be inferred from the receiver's clock. Everything here works
//! on whole seconds since the Unix epoch, without a calendar crate.

use std::time::{Duration, SystemTime};

const SECS_PER_DAY: u64 = 86_400;

/// Source of "now" for year inference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Clock {
    /// The system wall clock.
    #[default]
    System,
    /// A frozen instant, for replaying captures and for tests.
    Fixed(SystemTime),
}

impl Clock {
    pub fn now(&self) -> SystemTime {
        match self {
            Self::System => SystemTime::now(),
            Self::Fixed(t) => *t,
        }
    }
}

/// A UTC calendar day expressed as year and 1-based day-of-year.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct UtcDay {
    pub year: i32,
    pub day_of_year: u16,
}

impl UtcDay {
    /// The UTC day containing `time`. Times before the epoch clamp to 1970-001.
    pub fn from_system_time(time: SystemTime) -> Self {
        let days = epoch_secs(time) / SECS_PER_DAY;
        let (year, day_of_year) = civil_from_days(days);
        Self { year, day_of_year }
    }

    /// Year a message stamped with `day_of_year` was sent, seen from `self`.
    ///
    /// A day-of-year later than today can only come from last year: the
    /// message was delayed across the year boundary.
    pub fn resolve_year(&self, day_of_year: u16) -> i32 {
        if day_of_year > self.day_of_year {
            self.year - 1
        } else {
            self.year
        }
    }
}

/// Build a UTC instant from year, day-of-year, and time of day.
///
/// Returns `None` for days outside the given year or an out-of-range time.
pub fn from_day_of_year(
    year: i32,
    day_of_year: u16,
    hour: u32,
    minute: u32,
    second: u32,
) -> Option<SystemTime> {
    if year < 1970 || day_of_year == 0 || day_of_year > days_in_year(year) {
        return None;
    }
    if hour > 23 || minute > 59 || second > 60 {
        return None;
    }

    let days: u64 = (1970..year).map(|y| days_in_year(y) as u64).sum::<u64>()
        + (day_of_year as u64 - 1);
    let secs = days * SECS_PER_DAY + (hour as u64) * 3600 + (minute as u64) * 60 + second as u64;
    Some(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
}

/// Format as `YYYYMMDD-HHMMSS` (UTC), used for capture file suffixes.
pub fn file_stamp(time: SystemTime) -> String {
    let secs = epoch_secs(time);
    let (year, day_of_year) = civil_from_days(secs / SECS_PER_DAY);
    let (month, day) = month_day(year, day_of_year);
    let tod = secs % SECS_PER_DAY;
    format!(
        "{year:04}{month:02}{day:02}-{:02}{:02}{:02}",
        tod / 3600,
        (tod % 3600) / 60,
        tod % 60
    )
}

fn epoch_secs(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn is_leap(y: i32) -> bool {
    (y % 4 == 0 && y % 100 != 0) || y % 400 == 0
}

fn days_in_year(y: i32) -> u16 {
    if is_leap(y) { 366 } else { 365 }
}

/// Days since the epoch to (year, day-of-year).
fn civil_from_days(days: u64) -> (i32, u16) {
    let mut year = 1970;
    let mut remaining = days;
    loop {
        let len = days_in_year(year) as u64;
        if remaining < len {
            break;
        }
        remaining -= len;
        year += 1;
    }
    (year, remaining as u16 + 1)
}

fn month_day(year: i32, day_of_year: u16) -> (u16, u16) {
    let month_days: [u16; 12] = [
        31,
        if is_leap(year) { 29 } else { 28 },
        31,
        30,
        31,
        30,
        31,
        31,
        30,
        31,
        30,
        31,
    ];
    let mut remaining = day_of_year;
    for (i, &md) in month_days.iter().enumerate() {
        if remaining <= md {
            return (i as u16 + 1, remaining);
        }
        remaining -= md;
    }
    (12, 31)
}
