//! Calendar-wide options.

use serde::{Deserialize, Serialize};

use crate::date_range::RangeInput;
use crate::duration::{Duration, TimeUnit};
use crate::env::{DateEnv, DateEnvSettings, DateInput, TimeZoneSetting, WeekNumberCalculation};
use crate::error::{DatebookError, DatebookResult};
use crate::marker::MS_PER_HOUR;

/// Everything that configures date handling, view ranges and event parsing.
///
/// Keys are snake_case so the same struct reads from TOML, JSON and
/// environment overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarOptions {
    pub time_zone: TimeZoneSetting,
    pub locale: String,
    pub calendar_system: String,
    /// First day of the week, 0 = Sunday. Defaults to the locale's.
    pub first_day: Option<u32>,
    pub week_number_calculation: WeekNumberCalculation,
    pub week_text: Option<String>,

    pub default_all_day: Option<bool>,
    pub default_all_day_event_duration: Duration,
    pub default_timed_event_duration: Duration,
    pub force_event_duration: bool,
    pub next_day_threshold: Duration,
    pub all_day_maintain_duration: bool,
    pub lazy_fetching: bool,

    pub initial_view: String,
    pub initial_date: Option<DateInput>,
    /// Pins "today". Unset means the system clock.
    pub now: Option<DateInput>,
    pub valid_range: Option<RangeInput>,
    pub visible_range: Option<RangeInput>,
    /// Overrides the view's own duration.
    pub duration: Option<Duration>,
    pub day_count: Option<i64>,
    pub date_increment: Option<Duration>,
    pub date_alignment: Option<TimeUnit>,
    pub hidden_days: Vec<u32>,
    pub weekends: bool,
    pub fixed_week_count: bool,
    pub show_non_current_dates: bool,
    pub slot_min_time: Duration,
    pub slot_max_time: Duration,

    pub theme_system: String,
}

impl Default for CalendarOptions {
    fn default() -> Self {
        CalendarOptions {
            time_zone: TimeZoneSetting::Local,
            locale: "en".to_string(),
            calendar_system: "gregory".to_string(),
            first_day: None,
            week_number_calculation: WeekNumberCalculation::Local,
            week_text: None,
            default_all_day: None,
            default_all_day_event_duration: Duration::from_days(1),
            default_timed_event_duration: Duration::from_millis(MS_PER_HOUR),
            force_event_duration: false,
            next_day_threshold: Duration::ZERO,
            all_day_maintain_duration: false,
            lazy_fetching: true,
            initial_view: "dayGridMonth".to_string(),
            initial_date: None,
            now: None,
            valid_range: None,
            visible_range: None,
            duration: None,
            day_count: None,
            date_increment: None,
            date_alignment: None,
            hidden_days: Vec::new(),
            weekends: true,
            fixed_week_count: true,
            show_non_current_dates: true,
            slot_min_time: Duration::ZERO,
            slot_max_time: Duration::from_days(1),
            theme_system: "standard".to_string(),
        }
    }
}

impl CalendarOptions {
    pub fn date_env_settings(&self) -> DateEnvSettings {
        DateEnvSettings {
            time_zone: self.time_zone.clone(),
            locale: self.locale.clone(),
            calendar_system: self.calendar_system.clone(),
            first_day: self.first_day,
            week_number_calculation: self.week_number_calculation,
            week_text: self.week_text.clone(),
            ..Default::default()
        }
    }

    pub fn date_env(&self) -> DatebookResult<DateEnv> {
        DateEnv::new(self.date_env_settings())
    }

    /// Days of week (0 = Sunday) that views skip.
    pub fn hidden_day_mask(&self) -> DatebookResult<[bool; 7]> {
        let mut mask = [false; 7];
        for day in &self.hidden_days {
            let idx = usize::try_from(*day)
                .ok()
                .filter(|d| *d < 7)
                .ok_or_else(|| DatebookError::Config(format!("Invalid hidden day {day}")))?;
            mask[idx] = true;
        }
        if !self.weekends {
            mask[0] = true;
            mask[6] = true;
        }
        if mask.iter().all(|hidden| *hidden) {
            return Err(DatebookError::Config("Every day of the week is hidden".into()));
        }
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = CalendarOptions::default();
        assert!(opts.lazy_fetching);
        assert_eq!(opts.default_all_day_event_duration, Duration::from_days(1));
        assert_eq!(
            opts.default_timed_event_duration,
            Duration::from_millis(MS_PER_HOUR)
        );
        assert_eq!(opts.hidden_day_mask().unwrap(), [false; 7]);
    }

    #[test]
    fn test_deserialize_partial_json() {
        let opts: CalendarOptions = serde_json::from_str(
            r#"{
                "time_zone": "America/Chicago",
                "first_day": 1,
                "default_timed_event_duration": "02:00",
                "valid_range": {"start": "2018-06-01", "end": "2018-07-01"},
                "weekends": false
            }"#,
        )
        .unwrap();
        assert_eq!(
            opts.time_zone,
            TimeZoneSetting::Named("America/Chicago".to_string())
        );
        assert_eq!(
            opts.default_timed_event_duration,
            Duration::from_millis(2 * MS_PER_HOUR)
        );
        assert_eq!(opts.locale, "en");
        let mask = opts.hidden_day_mask().unwrap();
        assert!(mask[0] && mask[6] && !mask[1]);
    }

    #[test]
    fn test_all_days_hidden_is_rejected() {
        let opts = CalendarOptions {
            hidden_days: vec![1, 2, 3, 4, 5],
            weekends: false,
            ..Default::default()
        };
        assert!(matches!(opts.hidden_day_mask(), Err(DatebookError::Config(_))));
        let bad = CalendarOptions {
            hidden_days: vec![9],
            ..Default::default()
        };
        assert!(bad.hidden_day_mask().is_err());
    }
}
