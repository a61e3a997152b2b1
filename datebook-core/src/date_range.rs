//! Half-open date ranges and the interval helpers built on them.

use serde::{Deserialize, Serialize};

use crate::duration::Duration;
use crate::env::{DateEnv, DateInput};
use crate::error::{DatebookError, DatebookResult};
use crate::marker::Marker;

/// `[start, end)`. A zero-length range denotes an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Marker,
    pub end: Marker,
}

impl DateRange {
    pub fn new(start: Marker, end: Marker) -> DatebookResult<Self> {
        if end < start {
            return Err(DatebookError::RangeInvalid(format!(
                "range end {end} is before start {start}"
            )));
        }
        Ok(DateRange { start, end })
    }

    pub fn instant(at: Marker) -> Self {
        DateRange { start: at, end: at }
    }

    pub fn is_instant(&self) -> bool {
        self.start == self.end
    }

    pub fn duration_ms(&self) -> i64 {
        self.start.diff_ms(self.end)
    }

    pub fn contains(&self, marker: Marker) -> bool {
        self.start <= marker && marker < self.end
    }

    pub fn contains_range(&self, inner: &DateRange) -> bool {
        self.start <= inner.start && inner.end <= self.end
    }

    /// Standard half-open overlap test.
    pub fn intersects(&self, other: &DateRange) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Overlapping portion, or `None` when it would be empty.
    pub fn intersect(&self, other: &DateRange) -> Option<DateRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(DateRange { start, end })
    }
}

/// A range whose ends may be unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpenDateRange {
    pub start: Option<Marker>,
    pub end: Option<Marker>,
}

impl From<DateRange> for OpenDateRange {
    fn from(range: DateRange) -> Self {
        OpenDateRange {
            start: Some(range.start),
            end: Some(range.end),
        }
    }
}

impl OpenDateRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Both ends, if present.
    pub fn closed(&self) -> Option<DateRange> {
        Some(DateRange {
            start: self.start?,
            end: self.end?,
        })
    }

    pub fn contains(&self, marker: Marker) -> bool {
        self.start.is_none_or(|s| s <= marker) && self.end.is_none_or(|e| marker < e)
    }

    pub fn intersects(&self, other: &DateRange) -> bool {
        self.end.is_none_or(|e| e > other.start) && self.start.is_none_or(|s| s < other.end)
    }

    pub fn intersect(&self, other: &OpenDateRange) -> Option<OpenDateRange> {
        let start = match (self.start, other.start) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        match (start, end) {
            (Some(s), Some(e)) if s >= e => None,
            _ => Some(OpenDateRange { start, end }),
        }
    }

    pub fn intersect_closed(&self, other: &DateRange) -> Option<DateRange> {
        self.intersect(&OpenDateRange::from(*other))?.closed()
    }

    /// Move `marker` inside the range. The end is exclusive, so markers at or past
    /// it land one millisecond before it.
    pub fn constrain(&self, marker: Marker) -> Marker {
        if let Some(start) = self.start
            && marker < start
        {
            return start;
        }
        if let Some(end) = self.end
            && marker >= end
        {
            return end.add_ms(-1);
        }
        marker
    }
}

/// Expand a timed range to the whole days it visibly touches. An end time
/// earlier than `next_day_threshold` does not pull in its day.
pub fn compute_visible_day_range(
    range: &OpenDateRange,
    next_day_threshold: &Duration,
) -> OpenDateRange {
    let mut end_day = range.end.map(|end| {
        let day = end.start_of_day();
        let end_time_ms = day.diff_ms(end);
        if end_time_ms != 0 && end_time_ms >= next_day_threshold.as_roughly_ms() {
            day.add_days(1)
        } else {
            day
        }
    });

    let start_day = range.start.map(|start| start.start_of_day());
    if let (Some(start), Some(end)) = (start_day, end_day)
        && end <= start
    {
        end_day = Some(start.add_days(1));
    }

    OpenDateRange {
        start: start_day,
        end: end_day,
    }
}

/// Snap a timed range onto whole days, keeping at least one day.
pub fn compute_aligned_day_range(range: &DateRange) -> DateRange {
    let day_count = (range.start.diff_days(range.end).floor() as i64).max(1);
    let start = range.start.start_of_day();
    DateRange {
        start,
        end: start.add_days(day_count),
    }
}

/// Raw `{start, end}` as found in configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeInput {
    #[serde(default)]
    pub start: Option<DateInput>,
    #[serde(default)]
    pub end: Option<DateInput>,
}

impl RangeInput {
    /// Parse both ends through `env`. Fails when either end is malformed or
    /// the end precedes the start.
    pub fn parse(&self, env: &DateEnv) -> DatebookResult<OpenDateRange> {
        let start = self
            .start
            .as_ref()
            .map(|s| env.create_marker(s))
            .transpose()?;
        let end = self.end.as_ref().map(|e| env.create_marker(e)).transpose()?;
        if let (Some(s), Some(e)) = (start, end)
            && e < s
        {
            return Err(DatebookError::RangeInvalid(format!(
                "range end {e} is before start {s}"
            )));
        }
        Ok(OpenDateRange { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::MS_PER_HOUR;

    fn day(n: i64) -> Marker {
        Marker::EPOCH.add_days(n)
    }

    #[test]
    fn test_new_rejects_inverted() {
        assert!(DateRange::new(day(2), day(1)).is_err());
        assert!(DateRange::new(day(1), day(1)).unwrap().is_instant());
    }

    #[test]
    fn test_intersect_half_open() {
        let a = DateRange::new(day(0), day(5)).unwrap();
        let b = DateRange::new(day(5), day(9)).unwrap();
        assert!(!a.intersects(&b));
        assert_eq!(a.intersect(&b), None);

        let c = DateRange::new(day(3), day(9)).unwrap();
        assert_eq!(a.intersect(&c), Some(DateRange::new(day(3), day(5)).unwrap()));
    }

    #[test]
    fn test_open_range_intersect() {
        let open = OpenDateRange {
            start: Some(day(2)),
            end: None,
        };
        let closed = DateRange::new(day(0), day(4)).unwrap();
        assert_eq!(
            open.intersect_closed(&closed),
            Some(DateRange::new(day(2), day(4)).unwrap())
        );
        assert!(OpenDateRange::unbounded().intersects(&closed));
        assert_eq!(
            open.intersect(&OpenDateRange {
                start: None,
                end: Some(day(2))
            }),
            None
        );
    }

    #[test]
    fn test_constrain_marker() {
        let range = OpenDateRange::from(DateRange::new(day(1), day(3)).unwrap());
        assert_eq!(range.constrain(day(0)), day(1));
        assert_eq!(range.constrain(day(2)), day(2));
        assert_eq!(range.constrain(day(3)), day(3).add_ms(-1));
        assert_eq!(OpenDateRange::unbounded().constrain(day(7)), day(7));
    }

    #[test]
    fn test_visible_day_range_threshold() {
        let timed = OpenDateRange {
            start: Some(day(1).add_ms(22 * MS_PER_HOUR)),
            end: Some(day(2).add_ms(2 * MS_PER_HOUR)),
        };
        let strict = compute_visible_day_range(&timed, &Duration::ZERO);
        assert_eq!(strict.end, Some(day(3)));

        let lenient = compute_visible_day_range(&timed, &Duration::from_millis(9 * MS_PER_HOUR));
        assert_eq!(lenient.start, Some(day(1)));
        assert_eq!(lenient.end, Some(day(2)));
    }

    #[test]
    fn test_aligned_day_range_keeps_one_day() {
        let short = DateRange::new(day(4).add_ms(MS_PER_HOUR), day(4).add_ms(3 * MS_PER_HOUR)).unwrap();
        assert_eq!(
            compute_aligned_day_range(&short),
            DateRange::new(day(4), day(5)).unwrap()
        );

        let long = DateRange::new(day(4).add_ms(MS_PER_HOUR), day(6).add_ms(2 * MS_PER_HOUR)).unwrap();
        assert_eq!(
            compute_aligned_day_range(&long),
            DateRange::new(day(4), day(6)).unwrap()
        );
    }
}
