//! Structured durations: calendar components plus an exact millisecond part.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DatebookError, DatebookResult};
use crate::marker::{MS_PER_DAY, MS_PER_HOUR, MS_PER_MINUTE, MS_PER_SECOND};

/// Calendar and clock units understood throughout the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

impl TimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Year => "year",
            TimeUnit::Month => "month",
            TimeUnit::Week => "week",
            TimeUnit::Day => "day",
            TimeUnit::Hour => "hour",
            TimeUnit::Minute => "minute",
            TimeUnit::Second => "second",
            TimeUnit::Millisecond => "millisecond",
        }
    }

    /// Units whose ranges are whole calendar days.
    pub fn is_day_or_larger(&self) -> bool {
        matches!(
            self,
            TimeUnit::Year | TimeUnit::Month | TimeUnit::Week | TimeUnit::Day
        )
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = DatebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower == "ms" {
            return Ok(TimeUnit::Millisecond);
        }
        let unit = match lower.trim_end_matches('s') {
            "year" => TimeUnit::Year,
            "month" => TimeUnit::Month,
            "week" => TimeUnit::Week,
            "day" => TimeUnit::Day,
            "hour" => TimeUnit::Hour,
            "minute" => TimeUnit::Minute,
            "second" => TimeUnit::Second,
            "millisecond" => TimeUnit::Millisecond,
            _ => return Err(DatebookError::parse(format!("Unknown time unit '{s}'"))),
        };
        Ok(unit)
    }
}

/// A duration of `{years, months, days, milliseconds}`.
///
/// Calendar components are applied by calendar-system rules (one month is not a
/// fixed length), the millisecond component is always exact. Equality ignores
/// whether the duration was written in weeks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(try_from = "DurationInput")]
pub struct Duration {
    pub years: i64,
    pub months: i64,
    pub days: i64,
    pub milliseconds: i64,
    /// Set when the duration was written in weeks; lets week-long views snap
    /// to week boundaries.
    #[serde(skip)]
    pub specified_weeks: bool,
}

impl PartialEq for Duration {
    fn eq(&self, other: &Self) -> bool {
        self.years == other.years
            && self.months == other.months
            && self.days == other.days
            && self.milliseconds == other.milliseconds
    }
}

impl Eq for Duration {}

impl Duration {
    pub const ZERO: Duration = Duration {
        years: 0,
        months: 0,
        days: 0,
        milliseconds: 0,
        specified_weeks: false,
    };

    /// Build a duration, rejecting mixed-sign components.
    pub fn new(years: i64, months: i64, days: i64, milliseconds: i64) -> DatebookResult<Self> {
        let dur = Duration {
            years,
            months,
            days,
            milliseconds,
            specified_weeks: false,
        };
        if !dur.is_sign_uniform() {
            return Err(DatebookError::parse(format!(
                "Duration components must share a sign: {dur}"
            )));
        }
        Ok(dur)
    }

    pub fn from_millis(milliseconds: i64) -> Self {
        Duration {
            milliseconds,
            ..Duration::ZERO
        }
    }

    pub fn from_days(days: i64) -> Self {
        Duration {
            days,
            ..Duration::ZERO
        }
    }

    pub fn from_weeks(weeks: i64) -> Self {
        Duration {
            days: weeks.saturating_mul(7),
            specified_weeks: true,
            ..Duration::ZERO
        }
    }

    pub fn from_months(months: i64) -> Self {
        Duration {
            months,
            ..Duration::ZERO
        }
    }

    pub fn from_years(years: i64) -> Self {
        Duration {
            years,
            ..Duration::ZERO
        }
    }

    /// `value` whole units.
    pub fn of(value: i64, unit: TimeUnit) -> Self {
        match unit {
            TimeUnit::Year => Duration::from_years(value),
            TimeUnit::Month => Duration::from_months(value),
            TimeUnit::Week => Duration::from_weeks(value),
            TimeUnit::Day => Duration::from_days(value),
            TimeUnit::Hour => Duration::from_millis(value.saturating_mul(MS_PER_HOUR)),
            TimeUnit::Minute => Duration::from_millis(value.saturating_mul(MS_PER_MINUTE)),
            TimeUnit::Second => Duration::from_millis(value.saturating_mul(MS_PER_SECOND)),
            TimeUnit::Millisecond => Duration::from_millis(value),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Duration::ZERO
    }

    pub fn is_sign_uniform(&self) -> bool {
        let parts = [self.years, self.months, self.days, self.milliseconds];
        !(parts.iter().any(|p| *p > 0) && parts.iter().any(|p| *p < 0))
    }

    pub fn has_calendar_component(&self) -> bool {
        self.years != 0 || self.months != 0 || self.days != 0
    }

    pub fn as_roughly_years(&self) -> f64 {
        self.as_roughly_days() / 365.0
    }

    pub fn as_roughly_months(&self) -> f64 {
        self.as_roughly_days() / 30.0
    }

    pub fn as_roughly_days(&self) -> f64 {
        self.as_roughly_ms() as f64 / MS_PER_DAY as f64
    }

    /// Milliseconds, treating a year as 365 days and a month as 30.
    pub fn as_roughly_ms(&self) -> i64 {
        self.years
            .saturating_mul(365 * MS_PER_DAY)
            .saturating_add(self.months.saturating_mul(30 * MS_PER_DAY))
            .saturating_add(self.days.saturating_mul(MS_PER_DAY))
            .saturating_add(self.milliseconds)
    }

    /// Whole days, or zero if any non-day component is present.
    pub fn as_clean_days(&self) -> i64 {
        if self.years == 0 && self.months == 0 && self.milliseconds == 0 {
            self.days
        } else {
            0
        }
    }

    /// How many times `denominator` fits into `self`, if it fits exactly and
    /// consistently across every component.
    pub fn whole_divide(&self, denominator: &Duration) -> Option<i64> {
        let pairs = [
            (self.years, denominator.years),
            (self.months, denominator.months),
            (self.days, denominator.days),
            (self.milliseconds, denominator.milliseconds),
        ];
        let mut res: Option<i64> = None;
        for (num, den) in pairs {
            if den != 0 {
                if num % den != 0 {
                    return None;
                }
                let local = num / den;
                if res.is_some_and(|r| r != local) {
                    return None;
                }
                res = Some(local);
            } else if num != 0 {
                return None;
            }
        }
        res
    }

    /// The largest unit that expresses this duration as a whole number.
    pub fn greatest_denominator(&self) -> (TimeUnit, i64) {
        let ms = self.milliseconds;
        if ms != 0 {
            if ms % MS_PER_SECOND != 0 {
                return (TimeUnit::Millisecond, ms);
            }
            if ms % MS_PER_MINUTE != 0 {
                return (TimeUnit::Second, ms / MS_PER_SECOND);
            }
            if ms % MS_PER_HOUR != 0 {
                return (TimeUnit::Minute, ms / MS_PER_MINUTE);
            }
            return (TimeUnit::Hour, ms / MS_PER_HOUR);
        }
        if self.days != 0 {
            if self.specified_weeks && self.days % 7 == 0 {
                return (TimeUnit::Week, self.days / 7);
            }
            return (TimeUnit::Day, self.days);
        }
        if self.months != 0 {
            return (TimeUnit::Month, self.months);
        }
        if self.years != 0 {
            return (TimeUnit::Year, self.years);
        }
        (TimeUnit::Millisecond, 0)
    }

    /// Parse `"[-][D.]HH:mm[:ss[.SSS]]"` or an ISO-8601 duration (`"P1DT2H"`).
    pub fn parse(input: &str) -> DatebookResult<Self> {
        let s = input.trim();
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let dur = if body.starts_with('P') || body.starts_with('p') {
            parse_iso_duration(body)?
        } else {
            parse_clock_duration(body)
                .ok_or_else(|| DatebookError::parse(format!("Invalid duration '{input}'")))?
        };

        Ok(if negative { -dur } else { dur })
    }
}

fn clock_re() -> Option<&'static Regex> {
    static CLOCK_RE: OnceLock<Option<Regex>> = OnceLock::new();
    CLOCK_RE
        .get_or_init(|| {
            Regex::new(r"^(?:(\d+)\.)?(\d+):(\d\d)(?::(\d\d)(?:\.(\d\d\d))?)?$").ok()
        })
        .as_ref()
}

fn parse_clock_duration(s: &str) -> Option<Duration> {
    let caps = clock_re()?.captures(s)?;
    let num = |i: usize| -> Option<i64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    Some(Duration {
        days: num(1)?,
        milliseconds: checked_millis(&[
            (num(2)?, MS_PER_HOUR),
            (num(3)?, MS_PER_MINUTE),
            (num(4)?, MS_PER_SECOND),
            (num(5)?, 1),
        ])?,
        ..Duration::ZERO
    })
}

/// Sum of `count * unit` pairs, `None` on overflow.
fn checked_millis(parts: &[(i64, i64)]) -> Option<i64> {
    parts.iter().try_fold(0i64, |acc, &(count, unit)| {
        count.checked_mul(unit).and_then(|ms| acc.checked_add(ms))
    })
}

fn parse_iso_duration(s: &str) -> DatebookResult<Duration> {
    let parsed = iso8601::duration(&s.to_ascii_uppercase())
        .map_err(|e| DatebookError::parse(format!("Invalid ISO-8601 duration '{s}': {e}")))?;
    let dur = match parsed {
        iso8601::Duration::Weeks(w) => Duration::from_weeks(i64::from(w)),
        iso8601::Duration::YMDHMS {
            year,
            month,
            day,
            hour,
            minute,
            second,
            millisecond,
        } => Duration {
            years: i64::from(year),
            months: i64::from(month),
            days: i64::from(day),
            milliseconds: i64::from(hour) * MS_PER_HOUR
                + i64::from(minute) * MS_PER_MINUTE
                + i64::from(second) * MS_PER_SECOND
                + i64::from(millisecond),
            specified_weeks: false,
        },
    };
    Ok(dur)
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Duration {
        Duration {
            years: self.years.saturating_add(rhs.years),
            months: self.months.saturating_add(rhs.months),
            days: self.days.saturating_add(rhs.days),
            milliseconds: self.milliseconds.saturating_add(rhs.milliseconds),
            specified_weeks: false,
        }
    }
}

impl Sub for Duration {
    type Output = Duration;

    fn sub(self, rhs: Duration) -> Duration {
        self + -rhs
    }
}

impl Neg for Duration {
    type Output = Duration;

    fn neg(self) -> Duration {
        Duration {
            years: self.years.saturating_neg(),
            months: self.months.saturating_neg(),
            days: self.days.saturating_neg(),
            milliseconds: self.milliseconds.saturating_neg(),
            specified_weeks: self.specified_weeks,
        }
    }
}

impl Mul<i64> for Duration {
    type Output = Duration;

    fn mul(self, n: i64) -> Duration {
        Duration {
            years: self.years.saturating_mul(n),
            months: self.months.saturating_mul(n),
            days: self.days.saturating_mul(n),
            milliseconds: self.milliseconds.saturating_mul(n),
            specified_weeks: self.specified_weeks,
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}y {}mo {}d {}ms",
            self.years, self.months, self.days, self.milliseconds
        )
    }
}

impl FromStr for Duration {
    type Err = DatebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Duration::parse(s)
    }
}

/// Raw duration input as found in event data and configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DurationInput {
    Millis(i64),
    Text(String),
    Object(DurationObject),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DurationObject {
    #[serde(alias = "year")]
    pub years: i64,
    #[serde(alias = "month")]
    pub months: i64,
    #[serde(alias = "week")]
    pub weeks: i64,
    #[serde(alias = "day")]
    pub days: i64,
    #[serde(alias = "hour")]
    pub hours: i64,
    #[serde(alias = "minute")]
    pub minutes: i64,
    #[serde(alias = "second")]
    pub seconds: i64,
    #[serde(alias = "millisecond", alias = "ms")]
    pub milliseconds: i64,
}

impl TryFrom<DurationObject> for Duration {
    type Error = DatebookError;

    fn try_from(obj: DurationObject) -> Result<Self, Self::Error> {
        let too_large = || DatebookError::parse(format!("Duration out of range: {obj:?}"));
        let days = checked_millis(&[(obj.weeks, 7), (obj.days, 1)]).ok_or_else(too_large)?;
        let milliseconds = checked_millis(&[
            (obj.hours, MS_PER_HOUR),
            (obj.minutes, MS_PER_MINUTE),
            (obj.seconds, MS_PER_SECOND),
            (obj.milliseconds, 1),
        ])
        .ok_or_else(too_large)?;
        let mut dur = Duration::new(obj.years, obj.months, days, milliseconds)?;
        dur.specified_weeks = obj.weeks != 0;
        Ok(dur)
    }
}

impl TryFrom<DurationInput> for Duration {
    type Error = DatebookError;

    fn try_from(input: DurationInput) -> Result<Self, Self::Error> {
        match input {
            DurationInput::Millis(ms) => Ok(Duration::from_millis(ms)),
            DurationInput::Text(s) => Duration::parse(&s),
            DurationInput::Object(obj) => Duration::try_from(obj),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clock_strings() {
        assert_eq!(
            Duration::parse("09:30").unwrap(),
            Duration::from_millis(9 * MS_PER_HOUR + 30 * MS_PER_MINUTE)
        );
        assert_eq!(
            Duration::parse("1.02:00:05.250").unwrap(),
            Duration {
                days: 1,
                milliseconds: 2 * MS_PER_HOUR + 5 * MS_PER_SECOND + 250,
                ..Duration::ZERO
            }
        );
        assert_eq!(
            Duration::parse("-01:00").unwrap(),
            Duration::from_millis(-MS_PER_HOUR)
        );
        assert!(Duration::parse("9am").is_err());
    }

    #[test]
    fn test_parse_iso_strings() {
        assert_eq!(Duration::parse("P1D").unwrap(), Duration::from_days(1));
        assert_eq!(
            Duration::parse("PT1H30M").unwrap(),
            Duration::from_millis(90 * MS_PER_MINUTE)
        );
        let weeks = Duration::parse("P2W").unwrap();
        assert_eq!(weeks.days, 14);
        assert!(weeks.specified_weeks);
    }

    #[test]
    fn test_rejects_mixed_signs() {
        assert!(Duration::new(0, 1, -1, 0).is_err());
        assert!(Duration::new(0, -1, -1, 0).is_ok());
        let obj: Result<Duration, _> = serde_json::from_str(r#"{"days": 1, "hours": -2}"#);
        assert!(obj.is_err());
    }

    #[test]
    fn test_oversized_components_are_parse_errors() {
        let hours: Result<Duration, _> =
            serde_json::from_str(r#"{"hours": 9223372036854775807}"#);
        assert!(hours.is_err());
        let weeks: Result<Duration, _> =
            serde_json::from_str(r#"{"weeks": 9223372036854775807}"#);
        assert!(weeks.is_err());
        assert!(Duration::parse("9999999999999999:00").is_err());
        assert!(Duration::parse("99999999999999999999.01:00").is_err());
    }

    #[test]
    fn test_deserialize_variants() {
        let from_number: Duration = serde_json::from_str("5000").unwrap();
        assert_eq!(from_number, Duration::from_millis(5000));

        let from_object: Duration = serde_json::from_str(r#"{"week": 1}"#).unwrap();
        assert_eq!(from_object.days, 7);
        assert_eq!(from_object.greatest_denominator(), (TimeUnit::Week, 1));

        let from_text: Duration = serde_json::from_str(r#""02:00""#).unwrap();
        assert_eq!(from_text.greatest_denominator(), (TimeUnit::Hour, 2));
    }

    #[test]
    fn test_greatest_denominator() {
        assert_eq!(
            Duration::from_months(1).greatest_denominator(),
            (TimeUnit::Month, 1)
        );
        assert_eq!(
            Duration::from_days(7).greatest_denominator(),
            (TimeUnit::Day, 7)
        );
        assert_eq!(
            Duration::from_millis(90 * MS_PER_MINUTE).greatest_denominator(),
            (TimeUnit::Minute, 90)
        );
        assert_eq!(Duration::ZERO.greatest_denominator(), (TimeUnit::Millisecond, 0));
    }

    #[test]
    fn test_whole_divide() {
        let week = Duration::from_weeks(1);
        assert_eq!(Duration::from_days(21).whole_divide(&week), Some(3));
        assert_eq!(Duration::from_days(10).whole_divide(&week), None);
        assert_eq!(Duration::from_months(1).whole_divide(&week), None);
    }

    #[test]
    fn test_unit_from_str_accepts_plurals() {
        assert_eq!("weeks".parse::<TimeUnit>().unwrap(), TimeUnit::Week);
        assert_eq!("Day".parse::<TimeUnit>().unwrap(), TimeUnit::Day);
        assert!("fortnight".parse::<TimeUnit>().is_err());
    }
}
