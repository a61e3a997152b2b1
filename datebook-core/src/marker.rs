//! Date markers: timezone-naive points in time.
//!
//! A [`Marker`] is a count of milliseconds since the Unix epoch whose wall-clock
//! fields are always read as if they were UTC. Time zones are applied only by
//! [`DateEnv`](crate::env::DateEnv) when converting to and from real instants.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar_system::utc_marker;
use crate::duration::Duration;

pub const MS_PER_SECOND: i64 = 1000;
pub const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
pub const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
pub const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;
pub const MS_PER_WEEK: i64 = 7 * MS_PER_DAY;

/// Opaque, totally ordered point in time.
///
/// Markers outside chrono's representable span saturate to its bounds, so every
/// marker can be converted to calendar fields and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Marker(i64);

fn millis_bounds() -> (i64, i64) {
    (
        DateTime::<Utc>::MIN_UTC.timestamp_millis(),
        DateTime::<Utc>::MAX_UTC.timestamp_millis(),
    )
}

impl Marker {
    pub const EPOCH: Marker = Marker(0);

    pub fn from_millis(ms: i64) -> Self {
        let (lo, hi) = millis_bounds();
        Marker(ms.clamp(lo, hi))
    }

    pub const fn millis(self) -> i64 {
        self.0
    }

    /// Build a marker from naive wall-clock fields.
    pub fn from_naive(dt: NaiveDateTime) -> Self {
        Marker(dt.and_utc().timestamp_millis())
    }

    pub fn to_naive(self) -> NaiveDateTime {
        self.to_utc().naive_utc()
    }

    /// The marker's fields reinterpreted as a UTC instant.
    pub fn to_utc(self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.0).unwrap_or_default()
    }

    pub fn add_ms(self, ms: i64) -> Self {
        Marker::from_millis(self.0.saturating_add(ms))
    }

    pub fn add_days(self, days: i64) -> Self {
        self.add_ms(days.saturating_mul(MS_PER_DAY))
    }

    pub fn add_weeks(self, weeks: i64) -> Self {
        self.add_ms(weeks.saturating_mul(MS_PER_WEEK))
    }

    pub fn start_of_day(self) -> Self {
        self.floor_to(MS_PER_DAY)
    }

    pub fn start_of_hour(self) -> Self {
        self.floor_to(MS_PER_HOUR)
    }

    pub fn start_of_minute(self) -> Self {
        self.floor_to(MS_PER_MINUTE)
    }

    pub fn start_of_second(self) -> Self {
        self.floor_to(MS_PER_SECOND)
    }

    fn floor_to(self, unit: i64) -> Self {
        Marker::from_millis(self.0 - self.0.rem_euclid(unit))
    }

    /// Milliseconds elapsed since the start of the marker's day.
    pub fn time_as_ms(self) -> i64 {
        self.0.rem_euclid(MS_PER_DAY)
    }

    /// Day of week, 0 = Sunday.
    pub fn weekday(self) -> u32 {
        self.to_naive().weekday().num_days_from_sunday()
    }

    pub fn diff_ms(self, other: Marker) -> i64 {
        other.0 - self.0
    }

    pub fn diff_days(self, other: Marker) -> f64 {
        self.diff_ms(other) as f64 / MS_PER_DAY as f64
    }

    pub fn diff_weeks(self, other: Marker) -> f64 {
        self.diff_days(other) / 7.0
    }

    pub fn diff_hours(self, other: Marker) -> f64 {
        self.diff_ms(other) as f64 / MS_PER_HOUR as f64
    }

    /// Whole days between the markers, or `None` when their times of day differ.
    pub fn diff_whole_days(self, other: Marker) -> Option<i64> {
        if self.time_as_ms() != other.time_as_ms() {
            return None;
        }
        Some(self.diff_ms(other) / MS_PER_DAY)
    }

    pub fn diff_whole_weeks(self, other: Marker) -> Option<i64> {
        let days = self.diff_whole_days(other)?;
        (days % 7 == 0).then_some(days / 7)
    }

    /// Split the distance between two markers into calendar days plus a
    /// millisecond remainder.
    pub fn diff_day_and_time(self, other: Marker) -> Duration {
        let days = self.start_of_day().diff_ms(other.start_of_day()) / MS_PER_DAY;
        let milliseconds = self.add_days(days).diff_ms(other);
        Duration {
            days,
            milliseconds,
            ..Duration::ZERO
        }
    }

    /// Week number of the year, given the locale's first day of week (`dow`)
    /// and the day of January that must fall in week one (`doy`).
    pub fn week_of_year(self, dow: u32, doy: u32) -> i64 {
        let year = i64::from(self.to_naive().year());
        let week = week_of_given_year(self, year, dow, doy);
        if week < 1 {
            return week_of_given_year(self, year - 1, dow, doy);
        }
        let next_week = week_of_given_year(self, year + 1, dow, doy);
        if next_week >= 1 {
            return week.min(next_week);
        }
        week
    }
}

fn week_of_given_year(marker: Marker, year: i64, dow: u32, doy: u32) -> i64 {
    let first_week_start = utc_marker(year, 1, 1 + first_week_offset(year, dow, doy));
    let days = first_week_start.diff_ms(marker.start_of_day()) / MS_PER_DAY;
    days.div_euclid(7) + 1
}

fn first_week_offset(year: i64, dow: u32, doy: u32) -> i64 {
    let fwd = 7 + i64::from(dow) - i64::from(doy);
    let fwd_weekday = i64::from(utc_marker(year, 1, fwd).weekday());
    let fwdlw = (7 + fwd_weekday - i64::from(dow)).rem_euclid(7);
    -fwdlw + fwd - 1
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_naive().format("%Y-%m-%dT%H:%M:%S%.3f"))
    }
}
