//! Date profiles: the nested ranges a view shows for an anchor date.
//!
//! For every anchor the generator computes the valid range (configured
//! bounds), the current range (what the view is "about"), the render range
//! (what it draws, e.g. padded to whole weeks) and the active range (the
//! rendered part that is also valid).

mod reducer;
mod view;

pub use reducer::{NavigationState, ProfileAction, ProfileState, reduce};
pub use view::{ViewKind, ViewSpec, view_spec_for};

use serde::Serialize;
use tracing::debug;

use crate::date_range::{DateRange, OpenDateRange, compute_visible_day_range};
use crate::duration::{Duration, TimeUnit};
use crate::env::DateEnv;
use crate::error::{DatebookError, DatebookResult};
use crate::marker::Marker;
use crate::options::CalendarOptions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateProfile {
    /// The anchor, moved into the render range.
    pub current_date: Marker,
    /// Whether the current range touches the valid range at all.
    pub is_valid: bool,
    pub valid_range: OpenDateRange,
    pub current_range: DateRange,
    pub current_range_unit: TimeUnit,
    pub is_range_all_day: bool,
    /// `None` when nothing rendered is valid.
    pub active_range: Option<DateRange>,
    pub render_range: DateRange,
    pub slot_min_time: Duration,
    pub slot_max_time: Duration,
    pub date_increment: Duration,
}

/// Which way navigation is moving. Hidden days are skipped in this direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

impl Direction {
    fn step(self) -> i64 {
        match self {
            Direction::Backward => -1,
            Direction::Forward => 1,
        }
    }
}

struct CurrentRangeInfo {
    duration: Option<Duration>,
    unit: TimeUnit,
    range: DateRange,
}

#[derive(Debug, Clone)]
pub struct DateProfileGenerator {
    env: DateEnv,
    view: ViewSpec,
    valid_range: OpenDateRange,
    visible_range: Option<DateRange>,
    day_count: Option<i64>,
    date_alignment: Option<TimeUnit>,
    date_increment: Option<Duration>,
    hidden_days: [bool; 7],
    show_non_current_dates: bool,
    fixed_week_count: bool,
    slot_min_time: Duration,
    slot_max_time: Duration,
}

impl DateProfileGenerator {
    pub fn new(env: &DateEnv, view: ViewSpec, options: &CalendarOptions) -> DatebookResult<Self> {
        let view = match options.duration {
            Some(duration) if !duration.is_zero() => view.with_duration(duration),
            _ => view,
        };
        let valid_range = match &options.valid_range {
            Some(input) => compute_visible_day_range(&input.parse(env)?, &Duration::ZERO),
            None => OpenDateRange::unbounded(),
        };
        let visible_range = match &options.visible_range {
            Some(input) => {
                let parsed = compute_visible_day_range(&input.parse(env)?, &Duration::ZERO);
                parsed.closed()
            }
            None => None,
        };
        if let Some(count) = options.day_count
            && count < 1
        {
            return Err(DatebookError::Config(format!(
                "day_count must be positive, got {count}"
            )));
        }
        if let Some(inc) = options.date_increment
            && (inc.is_zero() || inc.as_roughly_ms() < 0)
        {
            return Err(DatebookError::Config(format!(
                "date_increment must be positive, got {inc}"
            )));
        }

        Ok(DateProfileGenerator {
            env: env.clone(),
            view,
            valid_range,
            visible_range,
            day_count: options.day_count,
            date_alignment: options.date_alignment,
            date_increment: options.date_increment,
            hidden_days: options.hidden_day_mask()?,
            show_non_current_dates: options.show_non_current_dates,
            fixed_week_count: options.fixed_week_count,
            slot_min_time: options.slot_min_time,
            slot_max_time: options.slot_max_time,
        })
    }

    pub fn view(&self) -> &ViewSpec {
        &self.view
    }

    pub fn env(&self) -> &DateEnv {
        &self.env
    }

    /// Profile for `date`. With `force_to_valid` the anchor is first moved
    /// inside the valid range.
    pub fn build(
        &self,
        date: Marker,
        direction: Option<Direction>,
        force_to_valid: bool,
    ) -> DateProfile {
        let valid_range = self.trim_hidden_days_open(&self.valid_range);
        let mut current_date = if force_to_valid {
            valid_range.constrain(date)
        } else {
            date
        };

        let info = self.build_current_range_info(current_date, direction);
        let is_range_all_day = info.unit.is_day_or_larger();
        let trimmed_current = self.trim_hidden_days(&info.range).unwrap_or(info.range);
        let render_range = self.build_render_range(&trimmed_current, info.unit);
        let render_range = self.trim_hidden_days(&render_range).unwrap_or(render_range);

        let mut active = Some(render_range);
        if !self.show_non_current_dates {
            active = active.and_then(|r| r.intersect(&info.range));
        }
        let active_range = active
            .map(|r| self.adjust_active_range(r))
            .and_then(|r| valid_range.intersect_closed(&r));

        let is_valid = valid_range.intersects(&info.range);

        if !render_range.contains(current_date) {
            current_date = render_range.start;
        }

        DateProfile {
            current_date,
            is_valid,
            valid_range,
            current_range: info.range,
            current_range_unit: info.unit,
            is_range_all_day,
            active_range,
            render_range,
            slot_min_time: self.slot_min_time,
            slot_max_time: self.slot_max_time,
            date_increment: self.build_date_increment(info.duration),
        }
    }

    pub fn build_prev(&self, profile: &DateProfile, current_date: Marker, force_to_valid: bool) -> DateProfile {
        let anchor = self.env.start_of(current_date, profile.current_range_unit);
        let prev = self.env.subtract(anchor, &profile.date_increment);
        self.build(prev, Some(Direction::Backward), force_to_valid)
    }

    pub fn build_next(&self, profile: &DateProfile, current_date: Marker, force_to_valid: bool) -> DateProfile {
        let anchor = self.env.start_of(current_date, profile.current_range_unit);
        let next = self.env.add(anchor, &profile.date_increment);
        self.build(next, Some(Direction::Forward), force_to_valid)
    }

    fn build_current_range_info(&self, date: Marker, direction: Option<Direction>) -> CurrentRangeInfo {
        if let Some(duration) = self.view.duration {
            let unit = duration.greatest_denominator().0;
            return CurrentRangeInfo {
                duration: Some(duration),
                unit,
                range: self.build_range_from_duration(date, direction, &duration, unit),
            };
        }
        if let Some(day_count) = self.day_count {
            return CurrentRangeInfo {
                duration: None,
                unit: TimeUnit::Day,
                range: self.build_range_from_day_count(date, direction, day_count),
            };
        }
        if let Some(range) = self.visible_range {
            return CurrentRangeInfo {
                duration: None,
                unit: self.env.greatest_whole_unit(range.start, range.end).0,
                range,
            };
        }
        let fallback = Duration::from_days(1);
        CurrentRangeInfo {
            duration: Some(fallback),
            unit: TimeUnit::Day,
            range: self.build_range_from_duration(date, direction, &fallback, TimeUnit::Day),
        }
    }

    fn build_range_from_duration(
        &self,
        date: Marker,
        direction: Option<Direction>,
        duration: &Duration,
        unit: TimeUnit,
    ) -> DateRange {
        let alignment = self.date_alignment.unwrap_or_else(|| match self.date_increment {
            Some(inc) if inc.as_roughly_ms() < duration.as_roughly_ms() => inc.greatest_denominator().0,
            _ => unit,
        });

        let compute = |date: Marker| {
            let start = self.env.start_of(date, alignment);
            let end = self.env.add(start, duration);
            DateRange { start, end }
        };

        let range = compute(date);
        if self.trim_hidden_days(&range).is_none() {
            // entirely hidden: move past the hidden days
            let step = direction.map(Direction::step).unwrap_or(1);
            debug!(view = %self.view.type_name, "Range is all hidden days, skipping ahead");
            return compute(self.skip_hidden_days(date, step, false));
        }
        range
    }

    fn build_range_from_day_count(&self, date: Marker, direction: Option<Direction>, day_count: i64) -> DateRange {
        let mut start = date;
        if let Some(alignment) = self.date_alignment {
            start = self.env.start_of(start, alignment);
        }
        let step = direction.map(Direction::step).unwrap_or(1);
        let start = self.skip_hidden_days(start.start_of_day(), step, false);

        let mut end = start;
        let mut running = 0;
        while running < day_count {
            end = end.add_days(1);
            if !self.is_hidden_day(end) {
                running += 1;
            }
        }
        DateRange { start, end }
    }

    fn build_render_range(&self, current: &DateRange, unit: TimeUnit) -> DateRange {
        if self.view.kind != ViewKind::DayGrid {
            return *current;
        }
        let mut start = current.start;
        let mut end = current.end;
        if matches!(unit, TimeUnit::Year | TimeUnit::Month) {
            start = self.env.start_of_week(start);
            let end_of_week = self.env.start_of_week(end);
            if end_of_week != end {
                end = end_of_week.add_weeks(1);
            }
        }
        if self.view.month_mode && self.fixed_week_count {
            let rows = start.diff_weeks(end).ceil() as i64;
            end = end.add_weeks(6 - rows);
        }
        DateRange { start, end }
    }

    /// Widen a time grid's active range for slot times outside the day.
    fn adjust_active_range(&self, range: DateRange) -> DateRange {
        let DateRange { mut start, mut end } = range;
        if self.view.uses_min_max_time() {
            if self.slot_min_time.as_roughly_days() < 0.0 {
                start = self.env.add(start.start_of_day(), &self.slot_min_time);
            }
            if self.slot_max_time.as_roughly_days() > 1.0 {
                end = self.env.add(end.start_of_day().add_days(-1), &self.slot_max_time);
            }
        }
        DateRange { start, end }
    }

    fn build_date_increment(&self, fallback: Option<Duration>) -> Duration {
        if let Some(inc) = self.date_increment {
            return inc;
        }
        if let Some(alignment) = self.date_alignment {
            return Duration::of(1, alignment);
        }
        fallback.unwrap_or_else(|| Duration::from_days(1))
    }

    pub fn is_hidden_day(&self, marker: Marker) -> bool {
        self.hidden_days[marker.weekday() as usize]
    }

    /// Step `date` by whole days in direction `inc` until it lands on a shown
    /// day. With `exclusive`, the day before `date` (in step direction) is
    /// tested instead, which is what range ends need.
    pub fn skip_hidden_days(&self, mut date: Marker, inc: i64, exclusive: bool) -> Marker {
        let offset = if exclusive { inc } else { 0 };
        while self.hidden_days[(i64::from(date.weekday()) + offset).rem_euclid(7) as usize] {
            date = date.add_days(inc);
        }
        date
    }

    /// Shrink a range so it neither starts nor ends on hidden days. `None`
    /// when nothing is left.
    pub fn trim_hidden_days(&self, range: &DateRange) -> Option<DateRange> {
        let start = self.skip_hidden_days(range.start, 1, false);
        let end = self.skip_hidden_days(range.end, -1, true);
        (start < end).then_some(DateRange { start, end })
    }

    fn trim_hidden_days_open(&self, range: &OpenDateRange) -> OpenDateRange {
        let trimmed = OpenDateRange {
            start: range.start.map(|s| self.skip_hidden_days(s, 1, false)),
            end: range.end.map(|e| self.skip_hidden_days(e, -1, true)),
        };
        match (trimmed.start, trimmed.end) {
            (Some(s), Some(e)) if s >= e => *range,
            _ => trimmed,
        }
    }
}
