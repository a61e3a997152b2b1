//! Expansion of the normalised day-of-week recurrence rule.
//!
//! Feed grammars such as iCalendar RRULE are expanded by the source adapter;
//! here a rule is only a set of weekdays, optional bounds and times of day.

use serde::Serialize;

use crate::date_range::{DateRange, OpenDateRange};
use crate::duration::Duration;
use crate::env::DateEnv;
use crate::error::{DatebookError, DatebookResult};
use crate::marker::{MS_PER_DAY, Marker};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    /// Weekdays to repeat on, 0 = Sunday. `None` repeats daily.
    pub days_of_week: Option<[bool; 7]>,
    pub start_time: Option<Duration>,
    pub end_time: Option<Duration>,
    pub start_recur: Option<Marker>,
    pub end_recur: Option<Marker>,
}

impl RecurrenceRule {
    pub fn new(
        days_of_week: Option<&[u32]>,
        start_time: Option<Duration>,
        end_time: Option<Duration>,
        start_recur: Option<Marker>,
        end_recur: Option<Marker>,
    ) -> DatebookResult<Self> {
        let days_of_week = match days_of_week {
            Some(days) => {
                let mut mask = [false; 7];
                for day in days {
                    let idx = usize::try_from(*day)
                        .ok()
                        .filter(|d| *d < 7)
                        .ok_or_else(|| DatebookError::parse(format!("Invalid day of week {day}")))?;
                    mask[idx] = true;
                }
                Some(mask)
            }
            None => None,
        };
        Ok(RecurrenceRule {
            days_of_week,
            start_time,
            end_time,
            start_recur,
            end_recur,
        })
    }

    /// The rule's own bounds.
    pub fn bounds(&self) -> OpenDateRange {
        OpenDateRange {
            start: self.start_recur,
            end: self.end_recur,
        }
    }

    /// Default occurrence length: `end_time - start_time`, or `end_time` alone.
    /// An end time before the start time falls on the following day.
    pub fn implied_duration(&self) -> Option<Duration> {
        let end = self.end_time?;
        let Some(start) = self.start_time else {
            return Some(end);
        };
        let ms = end.as_roughly_ms().saturating_sub(start.as_roughly_ms());
        if ms < 0 {
            return Some(Duration::from_millis(ms.rem_euclid(MS_PER_DAY)));
        }
        Some(end - start)
    }

    /// Occurrences overlapping `window`, each lasting `duration`.
    pub fn expand<'a>(
        &'a self,
        window: &DateRange,
        duration: Duration,
        all_day: bool,
        env: &'a DateEnv,
    ) -> Occurrences<'a> {
        // widen by the duration so occurrences starting before the window
        // but still running into it are found
        let search_start = env.subtract(window.start, &duration).start_of_day();
        let framing = DateRange {
            start: search_start,
            end: window.end,
        };
        let clipped = self.bounds().intersect_closed(&framing);
        Occurrences {
            rule: self,
            env,
            duration,
            all_day,
            window: *window,
            day: clipped.map(|r| r.start.start_of_day()),
            end: clipped.map(|r| r.end),
            recur_start: self.start_recur,
        }
    }
}

/// A finite, restartable walk over the matching days of one window.
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    rule: &'a RecurrenceRule,
    env: &'a DateEnv,
    duration: Duration,
    all_day: bool,
    window: DateRange,
    day: Option<Marker>,
    end: Option<Marker>,
    recur_start: Option<Marker>,
}

impl Iterator for Occurrences<'_> {
    type Item = DateRange;

    fn next(&mut self) -> Option<DateRange> {
        let end = self.end?;
        while let Some(day) = self.day {
            if day >= end {
                self.day = None;
                return None;
            }
            self.day = Some(day.add_days(1));

            if let Some(mask) = &self.rule.days_of_week
                && !mask[day.weekday() as usize]
            {
                continue;
            }
            let mut start = match (&self.rule.start_time, self.all_day) {
                (Some(time), false) => self.env.add(day, time),
                _ => day,
            };
            if self.all_day {
                start = start.start_of_day();
            }
            if let Some(recur_start) = self.recur_start
                && start < recur_start.start_of_day()
            {
                continue;
            }
            let range = DateRange {
                start,
                end: self.env.add(start, &self.duration).max(start),
            };
            let overlaps = if range.is_instant() {
                self.window.contains(range.start)
            } else {
                range.intersects(&self.window)
            };
            if overlaps && start < end {
                return Some(range);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::DateInput;
    use crate::marker::MS_PER_HOUR;

    fn mk(s: &str) -> Marker {
        DateEnv::utc().create_marker(&DateInput::from(s)).unwrap()
    }

    fn window(a: &str, b: &str) -> DateRange {
        DateRange::new(mk(a), mk(b)).unwrap()
    }

    #[test]
    fn test_weekdays_with_times() {
        let env = DateEnv::utc();
        let rule = RecurrenceRule::new(
            Some(&[2, 4][..]),
            Some(Duration::from_millis(9 * MS_PER_HOUR)),
            Some(Duration::from_millis(11 * MS_PER_HOUR)),
            None,
            None,
        )
        .unwrap();
        let duration = rule.implied_duration().unwrap();
        let found: Vec<DateRange> = rule
            .expand(&window("2017-07-03", "2017-07-10"), duration, false, &env)
            .collect();
        assert_eq!(
            found,
            vec![
                window("2017-07-04T09:00", "2017-07-04T11:00"),
                window("2017-07-06T09:00", "2017-07-06T11:00"),
            ]
        );
    }

    #[test]
    fn test_recur_bounds_clip_window() {
        let env = DateEnv::utc();
        let rule =
            RecurrenceRule::new(None, None, None, Some(mk("2017-07-05")), Some(mk("2017-07-08")))
                .unwrap();
        let found: Vec<DateRange> = rule
            .expand(&window("2017-07-01", "2017-07-31"), Duration::from_days(1), true, &env)
            .collect();
        assert_eq!(
            found,
            vec![
                window("2017-07-05", "2017-07-06"),
                window("2017-07-06", "2017-07-07"),
                window("2017-07-07", "2017-07-08"),
            ]
        );
    }

    #[test]
    fn test_occurrence_running_into_window() {
        let env = DateEnv::utc();
        let rule = RecurrenceRule::new(
            Some(&[0][..]),
            Some(Duration::from_millis(22 * MS_PER_HOUR)),
            None,
            None,
            None,
        )
        .unwrap();
        let found: Vec<DateRange> = rule
            .expand(
                &window("2017-07-03", "2017-07-04"),
                Duration::from_millis(4 * MS_PER_HOUR),
                false,
                &env,
            )
            .collect();
        assert_eq!(found, vec![window("2017-07-02T22:00", "2017-07-03T02:00")]);

        // an occurrence ending exactly at the window start is excluded
        let found: Vec<DateRange> = rule
            .expand(
                &window("2017-07-03T02:00", "2017-07-04"),
                Duration::from_millis(4 * MS_PER_HOUR),
                false,
                &env,
            )
            .collect();
        assert!(found.is_empty());
    }

    #[test]
    fn test_overnight_times_wrap_to_next_day() {
        let env = DateEnv::utc();
        let rule = RecurrenceRule::new(
            Some(&[3][..]),
            Some(Duration::from_millis(22 * MS_PER_HOUR)),
            Some(Duration::from_millis(2 * MS_PER_HOUR)),
            None,
            None,
        )
        .unwrap();
        let duration = rule.implied_duration().unwrap();
        assert_eq!(duration, Duration::from_millis(4 * MS_PER_HOUR));

        let found: Vec<DateRange> = rule
            .expand(&window("2017-07-03", "2017-07-10"), duration, false, &env)
            .collect();
        assert_eq!(found, vec![window("2017-07-05T22:00", "2017-07-06T02:00")]);
    }

    #[test]
    fn test_negative_duration_never_ends_before_start() {
        let env = DateEnv::utc();
        let rule = RecurrenceRule::new(Some(&[3][..]), None, None, None, None).unwrap();
        let found: Vec<DateRange> = rule
            .expand(
                &window("2017-07-03", "2017-07-10"),
                Duration::from_millis(-MS_PER_HOUR),
                false,
                &env,
            )
            .collect();
        assert_eq!(found.len(), 1);
        assert!(found[0].start <= found[0].end);
    }

    #[test]
    fn test_restartable() {
        let env = DateEnv::utc();
        let rule = RecurrenceRule::new(Some(&[1][..]), None, None, None, None).unwrap();
        let w = window("2024-01-01", "2024-02-01");
        let first = rule.expand(&w, Duration::from_days(1), true, &env).count();
        let second = rule.expand(&w, Duration::from_days(1), true, &env).count();
        assert_eq!(first, 5);
        assert_eq!(first, second);
        assert!(RecurrenceRule::new(Some(&[7][..]), None, None, None, None).is_err());
    }
}
