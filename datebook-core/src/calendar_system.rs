//! Calendar systems: mapping between markers and date-field arrays.
//!
//! Field arrays are `[year, month, day, hour, minute, second, millisecond]`
//! with 1-based months and days. Out-of-range fields roll over into the next
//! larger field (month 13 is January of the following year, day 0 is the last
//! day of the previous month), the same way for every calendar operation.

use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Timelike};

use crate::error::{DatebookError, DatebookResult};
use crate::marker::{MS_PER_DAY, MS_PER_HOUR, MS_PER_MINUTE, MS_PER_SECOND, Marker};

/// Expanded date fields of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateFields {
    pub year: i64,
    pub month: i64,
    pub day: i64,
    pub hour: i64,
    pub minute: i64,
    pub second: i64,
    pub millisecond: i64,
}

impl DateFields {
    pub fn ymd(year: i64, month: i64, day: i64) -> Self {
        DateFields {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
            millisecond: 0,
        }
    }

    /// Build from a partial array; missing month/day default to 1, the rest to 0.
    pub fn from_slice(parts: &[i64]) -> DatebookResult<Self> {
        if parts.is_empty() || parts.len() > 7 {
            return Err(DatebookError::parse(format!(
                "Date field array must have 1 to 7 elements, got {}",
                parts.len()
            )));
        }
        let get = |i: usize, default: i64| parts.get(i).copied().unwrap_or(default);
        Ok(DateFields {
            year: parts[0],
            month: get(1, 1),
            day: get(2, 1),
            hour: get(3, 0),
            minute: get(4, 0),
            second: get(5, 0),
            millisecond: get(6, 0),
        })
    }

    pub fn to_array(&self) -> [i64; 7] {
        [
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.millisecond,
        ]
    }
}

/// Algorithm mapping linear markers to calendar fields and back.
///
/// `array_to_marker(marker_to_array(m)) == m` must hold for every marker.
pub trait CalendarSystem: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    fn marker_to_array(&self, marker: Marker) -> DateFields;

    /// Normalizes out-of-range fields by rolling them over.
    fn array_to_marker(&self, fields: &DateFields) -> Marker;

    fn marker_year(&self, marker: Marker) -> i64 {
        self.marker_to_array(marker).year
    }

    fn marker_month(&self, marker: Marker) -> i64 {
        self.marker_to_array(marker).month
    }

    fn marker_day(&self, marker: Marker) -> i64 {
        self.marker_to_array(marker).day
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GregorianCalendarSystem;

impl CalendarSystem for GregorianCalendarSystem {
    fn id(&self) -> &str {
        "gregory"
    }

    fn marker_to_array(&self, marker: Marker) -> DateFields {
        let dt = marker.to_naive();
        DateFields {
            year: i64::from(dt.year()),
            month: i64::from(dt.month()),
            day: i64::from(dt.day()),
            hour: i64::from(dt.hour()),
            minute: i64::from(dt.minute()),
            second: i64::from(dt.second()),
            millisecond: i64::from(dt.nanosecond() / 1_000_000),
        }
    }

    fn array_to_marker(&self, fields: &DateFields) -> Marker {
        let month0 = fields.month.saturating_sub(1);
        let year = fields.year.saturating_add(month0.div_euclid(12));
        let month = month0.rem_euclid(12) + 1;

        let Some(days) = days_from_epoch(year, month) else {
            return if year < 1970 {
                Marker::from_millis(i64::MIN)
            } else {
                Marker::from_millis(i64::MAX)
            };
        };

        let ms = days
            .saturating_add(fields.day)
            .saturating_sub(1)
            .saturating_mul(MS_PER_DAY)
            .saturating_add(fields.hour.saturating_mul(MS_PER_HOUR))
            .saturating_add(fields.minute.saturating_mul(MS_PER_MINUTE))
            .saturating_add(fields.second.saturating_mul(MS_PER_SECOND))
            .saturating_add(fields.millisecond);
        Marker::from_millis(ms)
    }
}

/// Days from 1970-01-01 to the first day of `year`-`month`.
fn days_from_epoch(year: i64, month: i64) -> Option<i64> {
    let year = i32::try_from(year).ok()?;
    let month = u32::try_from(month).ok()?;
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    Some(first.signed_duration_since(NaiveDate::default()).num_days())
}

/// Gregorian marker for a (possibly out-of-range) year/month/day.
pub(crate) fn utc_marker(year: i64, month: i64, day: i64) -> Marker {
    GregorianCalendarSystem.array_to_marker(&DateFields::ymd(year, month, day))
}

/// Look up a calendar system by id.
pub fn calendar_system_for(id: &str) -> DatebookResult<Arc<dyn CalendarSystem>> {
    match id {
        "gregory" | "gregorian" => Ok(Arc::new(GregorianCalendarSystem)),
        other => Err(DatebookError::Config(format!(
            "Unknown calendar system '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(parts: &[i64]) -> DateFields {
        DateFields::from_slice(parts).unwrap()
    }

    #[test]
    fn test_roundtrip_markers() {
        let cal = GregorianCalendarSystem;
        for ms in [
            0,
            -1,
            951_782_400_000,        // 2000-02-29
            1_709_164_800_123,      // 2024-02-29T00:00:00.123
            -62_135_596_800_000,    // 0001-01-01
            253_402_300_799_999,    // 9999-12-31T23:59:59.999
        ] {
            let m = Marker::from_millis(ms);
            assert_eq!(cal.array_to_marker(&cal.marker_to_array(m)), m, "{ms}");
        }
    }

    #[test]
    fn test_leap_years() {
        let cal = GregorianCalendarSystem;
        let feb29 = cal.array_to_marker(&fields(&[2024, 2, 29]));
        assert_eq!(cal.marker_to_array(feb29).to_array(), [2024, 2, 29, 0, 0, 0, 0]);

        // 1900 was not a leap year, Feb 29 rolls to Mar 1
        let rolled = cal.array_to_marker(&fields(&[1900, 2, 29]));
        assert_eq!(cal.marker_to_array(rolled).to_array(), [1900, 3, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_out_of_range_fields_roll_over() {
        let cal = GregorianCalendarSystem;
        let m = cal.array_to_marker(&fields(&[2023, 13, 1]));
        assert_eq!(cal.marker_to_array(m).to_array()[..3], [2024, 1, 1]);

        let m = cal.array_to_marker(&fields(&[2024, 1, 32]));
        assert_eq!(cal.marker_to_array(m).to_array()[..3], [2024, 2, 1]);

        let m = cal.array_to_marker(&fields(&[2024, 3, 0]));
        assert_eq!(cal.marker_to_array(m).to_array()[..3], [2024, 2, 29]);

        let m = cal.array_to_marker(&fields(&[2024, 0, 1]));
        assert_eq!(cal.marker_to_array(m).to_array()[..3], [2023, 12, 1]);

        let m = cal.array_to_marker(&fields(&[2024, 1, 1, 25, 61]));
        assert_eq!(cal.marker_to_array(m).to_array(), [2024, 1, 2, 2, 1, 0, 0]);
    }

    #[test]
    fn test_huge_fields_saturate() {
        let cal = GregorianCalendarSystem;
        let latest = Marker::from_millis(i64::MAX);
        assert_eq!(cal.array_to_marker(&fields(&[2024, 1, i64::MAX])), latest);
        assert!(cal.array_to_marker(&fields(&[2024, i64::MIN, 1])).millis() < 0);
        assert_eq!(
            cal.array_to_marker(&fields(&[2024, 1, 1, i64::MAX, i64::MAX])),
            latest
        );
    }

    #[test]
    fn test_partial_arrays() {
        assert_eq!(fields(&[2018]).to_array(), [2018, 1, 1, 0, 0, 0, 0]);
        assert!(DateFields::from_slice(&[]).is_err());
        assert!(DateFields::from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]).is_err());
    }

    #[test]
    fn test_lookup() {
        assert_eq!(calendar_system_for("gregory").unwrap().id(), "gregory");
        assert!(calendar_system_for("hebrew").is_err());
    }
}
