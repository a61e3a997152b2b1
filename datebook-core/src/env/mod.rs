//! The date environment.
//!
//! [`DateEnv`] bundles a calendar system, a time zone and a locale. It turns
//! external date inputs into [`Marker`]s, does calendar-aware arithmetic on
//! them, and converts them back into real instants and display text.

mod locale;
mod parsing;
mod timezone;

pub use locale::{DateOrder, Locale, locale_for};
pub use parsing::{ParsedDate, parse_iso};
pub use timezone::{
    ChronoTzProvider, ChronoZone, HostLocalZone, NamedTimeZoneImpl, TimeZoneProvider,
    TimeZoneSetting, format_offset,
};

use std::sync::Arc;

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::calendar_system::{CalendarSystem, DateFields, calendar_system_for};
use crate::duration::{Duration, TimeUnit};
use crate::error::{DatebookError, DatebookResult};
use crate::format::{DateFormatter, ZonedMarker};
use crate::marker::{MS_PER_DAY, MS_PER_HOUR, MS_PER_MINUTE, MS_PER_SECOND, MS_PER_WEEK, Marker};

/// Raw date input: epoch milliseconds, an ISO-8601-like string, or a field
/// array `[year, month, day, hour, minute, second, ms]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    Timestamp(i64),
    Text(String),
    Fields(Vec<i64>),
}

impl From<&str> for DateInput {
    fn from(s: &str) -> Self {
        DateInput::Text(s.to_string())
    }
}

impl From<String> for DateInput {
    fn from(s: String) -> Self {
        DateInput::Text(s)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for DateInput {
    fn from(dt: DateTime<Tz>) -> Self {
        DateInput::Timestamp(dt.timestamp_millis())
    }
}

impl From<NaiveDateTime> for DateInput {
    fn from(dt: NaiveDateTime) -> Self {
        DateInput::Fields(vec![
            i64::from(dt.year()),
            i64::from(dt.month()),
            i64::from(dt.day()),
            i64::from(dt.hour()),
            i64::from(dt.minute()),
            i64::from(dt.second()),
            i64::from(dt.nanosecond() / 1_000_000),
        ])
    }
}

impl From<NaiveDate> for DateInput {
    fn from(d: NaiveDate) -> Self {
        DateInput::Fields(vec![
            i64::from(d.year()),
            i64::from(d.month()),
            i64::from(d.day()),
        ])
    }
}

/// A parsed marker plus what the input said about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerMeta {
    pub marker: Marker,
    pub is_time_unspecified: bool,
    /// Offset carried by the input when the environment cannot compute one
    /// itself; kept so the value can be written back out unchanged.
    pub forced_tzo: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekNumberCalculation {
    #[default]
    Local,
    #[serde(alias = "ISO")]
    Iso,
}

#[derive(Debug, Clone)]
pub struct DateEnvSettings {
    pub time_zone: TimeZoneSetting,
    pub locale: String,
    pub calendar_system: String,
    /// Overrides the locale's first day of week, 0 = Sunday.
    pub first_day: Option<u32>,
    pub week_number_calculation: WeekNumberCalculation,
    pub week_text: Option<String>,
    pub default_separator: Option<String>,
    pub time_zone_provider: Option<Arc<dyn TimeZoneProvider>>,
}

impl Default for DateEnvSettings {
    fn default() -> Self {
        DateEnvSettings {
            time_zone: TimeZoneSetting::Local,
            locale: "en".to_string(),
            calendar_system: "gregory".to_string(),
            first_day: None,
            week_number_calculation: WeekNumberCalculation::Local,
            week_text: None,
            default_separator: None,
            time_zone_provider: Some(Arc::new(ChronoTzProvider)),
        }
    }
}

/// Options for [`DateEnv::format_range`].
#[derive(Debug, Clone, Default)]
pub struct RangeFormatOptions {
    pub forced_start_tzo: Option<i64>,
    pub forced_end_tzo: Option<i64>,
    /// Format the end as the last millisecond inside the range.
    pub is_end_exclusive: bool,
    pub separator: Option<String>,
}

/// Options for [`DateEnv::format_iso`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IsoFormatOptions {
    /// Drop a midnight time (and with it the offset).
    pub omit_time: bool,
    pub omit_time_zone_offset: bool,
    pub forced_tzo: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct DateEnv {
    time_zone: TimeZoneSetting,
    /// `None` means markers are UTC wall clock.
    zone: Option<Arc<dyn NamedTimeZoneImpl>>,
    can_compute_offset: bool,
    calendar: Arc<dyn CalendarSystem>,
    locale: &'static Locale,
    locale_code: String,
    week_dow: u32,
    week_doy: u32,
    week_number_calculation: WeekNumberCalculation,
    week_text: String,
    default_separator: String,
}

impl DateEnv {
    pub fn new(settings: DateEnvSettings) -> DatebookResult<Self> {
        let calendar = calendar_system_for(&settings.calendar_system)?;
        let locale = locale_for(&settings.locale);

        let (zone, can_compute_offset) = match &settings.time_zone {
            TimeZoneSetting::Utc => (None, true),
            TimeZoneSetting::Local => {
                (Some(Arc::new(HostLocalZone) as Arc<dyn NamedTimeZoneImpl>), true)
            }
            TimeZoneSetting::Named(name) => {
                match settings
                    .time_zone_provider
                    .as_ref()
                    .and_then(|p| p.resolve(name))
                {
                    Some(zone) => (Some(zone), true),
                    None => {
                        warn!(time_zone = %name, "Unknown named time zone, using UTC arithmetic");
                        (None, false)
                    }
                }
            }
        };

        let (mut week_dow, mut week_doy) = (locale.week_dow, locale.week_doy);
        if settings.week_number_calculation == WeekNumberCalculation::Iso {
            week_dow = 1;
            week_doy = 4;
        }
        if let Some(first_day) = settings.first_day {
            if first_day > 6 {
                return Err(DatebookError::Config(format!(
                    "first_day must be between 0 and 6, got {first_day}"
                )));
            }
            week_dow = first_day;
        }

        Ok(DateEnv {
            time_zone: settings.time_zone,
            zone,
            can_compute_offset,
            calendar,
            locale,
            locale_code: settings.locale,
            week_dow,
            week_doy,
            week_number_calculation: settings.week_number_calculation,
            week_text: settings
                .week_text
                .unwrap_or_else(|| locale.week_text.to_string()),
            default_separator: settings
                .default_separator
                .unwrap_or_else(|| locale.range_separator.to_string()),
        })
    }

    /// A UTC, English environment.
    pub fn utc() -> Self {
        DateEnv {
            time_zone: TimeZoneSetting::Utc,
            zone: None,
            can_compute_offset: true,
            calendar: Arc::new(crate::calendar_system::GregorianCalendarSystem),
            locale: locale_for("en"),
            locale_code: "en".to_string(),
            week_dow: 0,
            week_doy: 6,
            week_number_calculation: WeekNumberCalculation::Local,
            week_text: "Week".to_string(),
            default_separator: " – ".to_string(),
        }
    }

    pub fn time_zone(&self) -> &TimeZoneSetting {
        &self.time_zone
    }

    pub fn can_compute_offset(&self) -> bool {
        self.can_compute_offset
    }

    pub fn calendar(&self) -> &dyn CalendarSystem {
        self.calendar.as_ref()
    }

    pub fn locale(&self) -> &'static Locale {
        self.locale
    }

    pub fn locale_codes(&self) -> Vec<String> {
        vec![self.locale_code.clone()]
    }

    pub fn week_dow(&self) -> u32 {
        self.week_dow
    }

    pub fn week_doy(&self) -> u32 {
        self.week_doy
    }

    pub fn week_text(&self) -> &str {
        &self.week_text
    }

    pub fn default_separator(&self) -> &str {
        &self.default_separator
    }

    // Creating markers

    pub fn create_marker(&self, input: &DateInput) -> DatebookResult<Marker> {
        Ok(self.create_marker_meta(input)?.marker)
    }

    pub fn create_marker_meta(&self, input: &DateInput) -> DatebookResult<MarkerMeta> {
        match input {
            DateInput::Text(s) => self.parse(s),
            DateInput::Timestamp(ms) => Ok(MarkerMeta {
                marker: self.timestamp_to_marker(*ms),
                is_time_unspecified: false,
                forced_tzo: None,
            }),
            DateInput::Fields(parts) => {
                let fields = DateFields::from_slice(parts)?;
                Ok(MarkerMeta {
                    marker: self.calendar.array_to_marker(&fields),
                    is_time_unspecified: parts.len() <= 3,
                    forced_tzo: None,
                })
            }
        }
    }

    fn parse(&self, s: &str) -> DatebookResult<MarkerMeta> {
        let parsed = parse_iso(s)?;
        let mut marker = parsed.marker;
        let mut forced_tzo = None;

        if let Some(tzo) = parsed.time_zone_offset {
            if self.can_compute_offset {
                marker = self.timestamp_to_marker(marker.millis() - tzo * MS_PER_MINUTE);
            } else {
                forced_tzo = Some(tzo);
            }
        }

        Ok(MarkerMeta {
            marker,
            is_time_unspecified: parsed.is_time_unspecified,
            forced_tzo,
        })
    }

    /// Current wall-clock marker for an explicit clock value.
    pub fn create_now_marker(&self, now: DateTime<Utc>) -> Marker {
        self.timestamp_to_marker(now.timestamp_millis())
    }

    pub fn now_marker(&self) -> Marker {
        self.create_now_marker(Utc::now())
    }

    // Arithmetic

    pub fn add(&self, marker: Marker, dur: &Duration) -> Marker {
        let mut f = self.calendar.marker_to_array(marker);
        f.year = f.year.saturating_add(dur.years);
        f.month = f.month.saturating_add(dur.months);
        f.day = f.day.saturating_add(dur.days);
        f.millisecond = f.millisecond.saturating_add(dur.milliseconds);
        self.calendar.array_to_marker(&f)
    }

    pub fn subtract(&self, marker: Marker, dur: &Duration) -> Marker {
        self.add(marker, &-*dur)
    }

    pub fn add_years(&self, marker: Marker, n: i64) -> Marker {
        let mut f = self.calendar.marker_to_array(marker);
        f.year = f.year.saturating_add(n);
        self.calendar.array_to_marker(&f)
    }

    pub fn add_months(&self, marker: Marker, n: i64) -> Marker {
        let mut f = self.calendar.marker_to_array(marker);
        f.month = f.month.saturating_add(n);
        self.calendar.array_to_marker(&f)
    }

    /// Whole `unit`s from `m0` to `m1`, truncated toward zero. Weeks are
    /// expressed as days.
    pub fn diff(&self, m0: Marker, m1: Marker, unit: TimeUnit) -> Duration {
        let ms = m0.diff_ms(m1);
        match unit {
            TimeUnit::Year => Duration::from_years(self.whole_months_between(m0, m1) / 12),
            TimeUnit::Month => Duration::from_months(self.whole_months_between(m0, m1)),
            TimeUnit::Week => Duration::from_weeks(ms / MS_PER_WEEK),
            TimeUnit::Day => Duration::from_days(ms / MS_PER_DAY),
            TimeUnit::Hour => Duration::from_millis(ms / MS_PER_HOUR * MS_PER_HOUR),
            TimeUnit::Minute => Duration::from_millis(ms / MS_PER_MINUTE * MS_PER_MINUTE),
            TimeUnit::Second => Duration::from_millis(ms / MS_PER_SECOND * MS_PER_SECOND),
            TimeUnit::Millisecond => Duration::from_millis(ms),
        }
    }

    fn whole_months_between(&self, m0: Marker, m1: Marker) -> i64 {
        let a = self.calendar.marker_to_array(m0);
        let b = self.calendar.marker_to_array(m1);
        let mut months = (b.year - a.year) * 12 + (b.month - a.month);
        // step back while adding the candidate overshoots m1
        while months > 0 && self.add_months(m0, months) > m1 {
            months -= 1;
        }
        while months < 0 && self.add_months(m0, months) < m1 {
            months += 1;
        }
        months
    }

    /// Years between markers sharing month, day and time of day.
    pub fn diff_whole_years(&self, m0: Marker, m1: Marker) -> Option<i64> {
        let a = self.calendar.marker_to_array(m0);
        let b = self.calendar.marker_to_array(m1);
        (m0.time_as_ms() == m1.time_as_ms() && a.month == b.month && a.day == b.day)
            .then_some(b.year - a.year)
    }

    /// Months between markers sharing day of month and time of day.
    pub fn diff_whole_months(&self, m0: Marker, m1: Marker) -> Option<i64> {
        let a = self.calendar.marker_to_array(m0);
        let b = self.calendar.marker_to_array(m1);
        (m0.time_as_ms() == m1.time_as_ms() && a.day == b.day)
            .then_some((b.year - a.year) * 12 + (b.month - a.month))
    }

    /// The largest unit that divides the span exactly.
    pub fn greatest_whole_unit(&self, m0: Marker, m1: Marker) -> (TimeUnit, i64) {
        if let Some(n) = self.diff_whole_years(m0, m1) {
            return (TimeUnit::Year, n);
        }
        if let Some(n) = self.diff_whole_months(m0, m1) {
            return (TimeUnit::Month, n);
        }
        if let Some(n) = m0.diff_whole_weeks(m1) {
            return (TimeUnit::Week, n);
        }
        if let Some(n) = m0.diff_whole_days(m1) {
            return (TimeUnit::Day, n);
        }
        let ms = m0.diff_ms(m1);
        for (unit, size) in [
            (TimeUnit::Hour, MS_PER_HOUR),
            (TimeUnit::Minute, MS_PER_MINUTE),
            (TimeUnit::Second, MS_PER_SECOND),
        ] {
            if ms % size == 0 {
                return (unit, ms / size);
            }
        }
        (TimeUnit::Millisecond, ms)
    }

    /// How many `dur`s fit between the markers, fractional when they don't
    /// line up.
    pub fn count_durations_between(&self, m0: Marker, m1: Marker, dur: &Duration) -> f64 {
        if dur.years != 0
            && let Some(n) = self.diff_whole_years(m0, m1)
        {
            return n as f64 / dur.as_roughly_years();
        }
        if dur.months != 0
            && let Some(n) = self.diff_whole_months(m0, m1)
        {
            return n as f64 / dur.as_roughly_months();
        }
        if dur.days != 0
            && let Some(n) = m0.diff_whole_days(m1)
        {
            return n as f64 / dur.as_roughly_days();
        }
        let rough = dur.as_roughly_ms();
        if rough == 0 {
            return 0.0;
        }
        m0.diff_ms(m1) as f64 / rough as f64
    }

    // Start-of

    pub fn start_of(&self, marker: Marker, unit: TimeUnit) -> Marker {
        match unit {
            TimeUnit::Year => self.start_of_year(marker),
            TimeUnit::Month => self.start_of_month(marker),
            TimeUnit::Week => self.start_of_week(marker),
            TimeUnit::Day => marker.start_of_day(),
            TimeUnit::Hour => marker.start_of_hour(),
            TimeUnit::Minute => marker.start_of_minute(),
            TimeUnit::Second => marker.start_of_second(),
            TimeUnit::Millisecond => marker,
        }
    }

    pub fn start_of_year(&self, marker: Marker) -> Marker {
        let year = self.calendar.marker_year(marker);
        self.calendar.array_to_marker(&DateFields::ymd(year, 1, 1))
    }

    pub fn start_of_month(&self, marker: Marker) -> Marker {
        let f = self.calendar.marker_to_array(marker);
        self.calendar.array_to_marker(&DateFields::ymd(f.year, f.month, 1))
    }

    pub fn start_of_week(&self, marker: Marker) -> Marker {
        let back = (7 + marker.weekday() - self.week_dow) % 7;
        marker.start_of_day().add_days(-i64::from(back))
    }

    pub fn compute_week_number(&self, marker: Marker) -> i64 {
        match self.week_number_calculation {
            WeekNumberCalculation::Iso => marker.week_of_year(1, 4),
            WeekNumberCalculation::Local => marker.week_of_year(self.week_dow, self.week_doy),
        }
    }

    // Time zones

    pub fn timestamp_to_marker(&self, ms: i64) -> Marker {
        match &self.zone {
            Some(zone) => zone.timestamp_to_marker(ms),
            None => Marker::from_millis(ms),
        }
    }

    /// Minutes east of UTC for a wall-clock marker, if computable.
    pub fn offset_for_marker(&self, marker: Marker) -> Option<i64> {
        if !self.can_compute_offset {
            return None;
        }
        Some(match &self.zone {
            Some(zone) => zone.offset_for_marker(marker),
            None => 0,
        })
    }

    /// The real instant for a marker, carrying the offset that was applied.
    pub fn to_date(&self, marker: Marker, forced_tzo: Option<i64>) -> DateTime<FixedOffset> {
        let tzo = forced_tzo
            .or_else(|| self.offset_for_marker(marker))
            .unwrap_or(0);
        let offset = i32::try_from(tzo * 60)
            .ok()
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        let instant = marker.add_ms(-tzo * MS_PER_MINUTE).to_utc();
        instant.with_timezone(&offset)
    }

    pub fn zoned(&self, marker: Marker, forced_tzo: Option<i64>) -> ZonedMarker {
        ZonedMarker {
            marker,
            time_zone_offset: forced_tzo.or_else(|| self.offset_for_marker(marker)),
        }
    }

    // Formatting

    pub fn format(
        &self,
        marker: Marker,
        formatter: &dyn DateFormatter,
        forced_tzo: Option<i64>,
    ) -> String {
        formatter.format(&self.zoned(marker, forced_tzo), self)
    }

    pub fn format_range(
        &self,
        start: Marker,
        end: Marker,
        formatter: &dyn DateFormatter,
        options: &RangeFormatOptions,
    ) -> String {
        let end = if options.is_end_exclusive {
            end.add_ms(-1)
        } else {
            end
        };
        let separator = options
            .separator
            .as_deref()
            .unwrap_or(&self.default_separator);
        formatter.format_range(
            &self.zoned(start, options.forced_start_tzo),
            &self.zoned(end, options.forced_end_tzo),
            self,
            separator,
        )
    }

    /// ISO-8601 text. A zero offset is written as `Z`, an unknown one is left off.
    pub fn format_iso(&self, marker: Marker, options: IsoFormatOptions) -> String {
        let tzo = if options.omit_time_zone_offset {
            None
        } else {
            options.forced_tzo.or_else(|| self.offset_for_marker(marker))
        };
        build_iso_string(marker, tzo, options.omit_time)
    }

    pub fn format_iso_date(&self, marker: Marker) -> String {
        marker.to_naive().format("%Y-%m-%d").to_string()
    }

    pub fn format_iso_time(&self, marker: Marker) -> String {
        marker.to_naive().format("%H:%M:%S").to_string()
    }
}

fn build_iso_string(marker: Marker, tzo: Option<i64>, strip_zero_time: bool) -> String {
    let naive = marker.to_naive();
    if strip_zero_time && marker.time_as_ms() == 0 {
        return naive.format("%Y-%m-%d").to_string();
    }
    let mut s = if marker.millis().rem_euclid(MS_PER_SECOND) == 0 {
        naive.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        naive.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
    };
    match tzo {
        None => {}
        Some(0) => s.push('Z'),
        Some(minutes) => s.push_str(&format_offset(minutes, false)),
    }
    s
}
