//! Structured-options formatter, driven by the locale tables.

use serde::{Deserialize, Serialize};

use super::{DateFormatter, ZonedMarker};
use crate::calendar_system::DateFields;
use crate::env::{DateEnv, DateOrder, Locale};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericStyle {
    #[serde(rename = "numeric")]
    Numeric,
    #[serde(rename = "2-digit")]
    TwoDigit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonthStyle {
    #[serde(rename = "numeric")]
    Numeric,
    #[serde(rename = "2-digit")]
    TwoDigit,
    #[serde(rename = "long")]
    Long,
    #[serde(rename = "short")]
    Short,
    #[serde(rename = "narrow")]
    Narrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextStyle {
    Long,
    Short,
    Narrow,
}

/// How the AM/PM marker is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeridiemStyle {
    /// `9am`
    Short,
    /// `9a`
    Narrow,
    /// `9 am`
    Lowercase,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeZoneNameStyle {
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStyle {
    Long,
    Short,
    Narrow,
    Numeric,
}

/// Field-by-field format settings, e.g. `{month: long, day: numeric}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    pub year: Option<NumericStyle>,
    pub month: Option<MonthStyle>,
    pub day: Option<NumericStyle>,
    pub weekday: Option<TextStyle>,
    pub hour: Option<NumericStyle>,
    pub minute: Option<NumericStyle>,
    pub second: Option<NumericStyle>,
    pub hour12: Option<bool>,
    pub meridiem: Option<MeridiemStyle>,
    #[serde(alias = "omitZeroMinute")]
    pub omit_zero_minute: bool,
    #[serde(alias = "timeZoneName")]
    pub time_zone_name: Option<TimeZoneNameStyle>,
    /// Format the week number instead of the date.
    pub week: Option<WeekStyle>,
    /// Range separator, overriding the environment's.
    pub separator: Option<String>,
    #[serde(alias = "omitCommas")]
    pub omit_commas: bool,
}

impl FormatOptions {
    fn has_date(&self) -> bool {
        self.year.is_some() || self.month.is_some() || self.day.is_some() || self.weekday.is_some()
    }

    fn has_time(&self) -> bool {
        self.hour.is_some() || self.minute.is_some() || self.second.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NativeFormatter {
    options: FormatOptions,
}

impl NativeFormatter {
    pub fn new(mut options: FormatOptions) -> Self {
        if !options.has_date() && !options.has_time() && options.week.is_none() {
            options.year = Some(NumericStyle::Numeric);
            options.month = Some(MonthStyle::Numeric);
            options.day = Some(NumericStyle::Numeric);
        }
        NativeFormatter { options }
    }

    fn date_text(&self, f: &DateFields, weekday: u32, locale: &Locale, with_year: bool) -> String {
        let o = &self.options;
        let weekday = o.weekday.map(|style| {
            let idx = weekday as usize % 7;
            match style {
                TextStyle::Long => locale.weekday_names[idx],
                TextStyle::Short => locale.weekday_names_short[idx],
                TextStyle::Narrow => locale.weekday_names_narrow[idx],
            }
        });
        let year = o.year.filter(|_| with_year).map(|style| match style {
            NumericStyle::Numeric => f.year.to_string(),
            NumericStyle::TwoDigit => format!("{:02}", f.year.rem_euclid(100)),
        });
        let day = o.day.map(|style| pad(f.day, style));

        let core = match o.month {
            Some(MonthStyle::Long) => text_date(locale, locale.month_name(f.month, false), day, year),
            Some(MonthStyle::Short) => text_date(locale, locale.month_name(f.month, true), day, year),
            Some(MonthStyle::Narrow) => {
                let initial: String = locale.month_name(f.month, false).chars().take(1).collect();
                text_date(locale, &initial.to_uppercase(), day, year)
            }
            Some(MonthStyle::Numeric) => numeric_date(locale, f.month.to_string(), day, year),
            Some(MonthStyle::TwoDigit) => numeric_date(locale, format!("{:02}", f.month), day, year),
            None => [day, year].into_iter().flatten().collect::<Vec<_>>().join(" "),
        };

        match weekday {
            Some(name) if core.is_empty() => name.to_string(),
            Some(name) if locale.weekday_comma => format!("{name}, {core}"),
            Some(name) => format!("{name} {core}"),
            None => core,
        }
    }

    fn time_text(&self, f: &DateFields, tzo: Option<i64>, locale: &Locale) -> Option<String> {
        let o = &self.options;
        if !o.has_time() {
            return None;
        }
        let hour12 = o.hour12.unwrap_or(locale.hour12);
        let mut parts = Vec::new();

        if let Some(style) = o.hour {
            let text = if hour12 {
                let h = match f.hour % 12 {
                    0 => 12,
                    h => h,
                };
                pad(h, style)
            } else {
                format!("{:02}", f.hour)
            };
            parts.push(text);
        }
        let drop_minute = o.omit_zero_minute && f.minute == 0 && o.second.is_none() && o.hour.is_some();
        if o.minute.is_some() && !drop_minute {
            parts.push(format!("{:02}", f.minute));
        }
        if o.second.is_some() {
            parts.push(format!("{:02}", f.second));
        }
        let mut text = parts.join(":");

        if hour12 && o.hour.is_some() {
            let meridiem = locale.meridiem[usize::from(f.hour >= 12)];
            match o.meridiem {
                None => {
                    text.push(' ');
                    text.push_str(meridiem);
                }
                Some(MeridiemStyle::Short) => text.push_str(&compact_meridiem(meridiem)),
                Some(MeridiemStyle::Narrow) => {
                    text.push_str(&compact_meridiem(meridiem).chars().take(1).collect::<String>())
                }
                Some(MeridiemStyle::Lowercase) => {
                    text.push(' ');
                    text.push_str(&meridiem.to_lowercase());
                }
                Some(MeridiemStyle::Hidden) => {}
            }
        }

        if o.time_zone_name.is_some()
            && let Some(minutes) = tzo
        {
            text.push(' ');
            text.push_str(&zone_name(minutes));
        }
        Some(text)
    }

    fn week_text(&self, style: WeekStyle, date: &ZonedMarker, env: &DateEnv) -> String {
        let num = env.compute_week_number(date.marker);
        match style {
            WeekStyle::Numeric => num.to_string(),
            WeekStyle::Narrow => format!("{}{num}", env.locale().week_text_short),
            WeekStyle::Short => format!("{} {num}", env.locale().week_text_short),
            WeekStyle::Long => format!("{} {num}", env.week_text()),
        }
    }

    fn finish(&self, text: String) -> String {
        if self.options.omit_commas {
            text.replace(',', "")
        } else {
            text
        }
    }

    fn full_text(&self, date: &ZonedMarker, env: &DateEnv) -> String {
        if let Some(style) = self.options.week {
            return self.week_text(style, date, env);
        }
        let f = env.calendar().marker_to_array(date.marker);
        let locale = env.locale();
        let date_part = self
            .options
            .has_date()
            .then(|| self.date_text(&f, date.marker.weekday(), locale, true));
        let time_part = self.time_text(&f, date.time_zone_offset, locale);
        join_date_time(date_part, time_part, locale)
    }
}

impl DateFormatter for NativeFormatter {
    fn format(&self, date: &ZonedMarker, env: &DateEnv) -> String {
        self.finish(self.full_text(date, env))
    }

    fn format_range(
        &self,
        start: &ZonedMarker,
        end: &ZonedMarker,
        env: &DateEnv,
        separator: &str,
    ) -> String {
        let sep = self.options.separator.as_deref().unwrap_or(separator);
        let start_full = self.full_text(start, env);
        let end_full = self.full_text(end, env);
        if start_full == end_full {
            return self.finish(start_full);
        }
        if self.options.week.is_some() {
            return self.finish(format!("{start_full}{sep}{end_full}"));
        }

        let o = &self.options;
        let locale = env.locale();
        let sf = env.calendar().marker_to_array(start.marker);
        let ef = env.calendar().marker_to_array(end.marker);
        let same_year = sf.year == ef.year;
        let same_month = same_year && sf.month == ef.month;
        let same_day = same_month && sf.day == ef.day;

        if same_day && o.has_time() {
            let date_part = o
                .has_date()
                .then(|| self.date_text(&sf, start.marker.weekday(), locale, true));
            let t0 = self.time_text(&sf, start.time_zone_offset, locale).unwrap_or_default();
            let t1 = self.time_text(&ef, end.time_zone_offset, locale).unwrap_or_default();
            let times = if t0 == t1 { t0 } else { format!("{t0}{sep}{t1}") };
            return self.finish(join_date_time(date_part, Some(times), locale));
        }

        let text_month = matches!(
            o.month,
            Some(MonthStyle::Long | MonthStyle::Short | MonthStyle::Narrow)
        );
        if !o.has_time() && text_month && o.weekday.is_none() && same_year {
            if same_month
                && let Some(style) = o.day
            {
                let month = match o.month {
                    Some(MonthStyle::Short) => locale.month_name(sf.month, true).to_string(),
                    Some(MonthStyle::Narrow) => locale
                        .month_name(sf.month, false)
                        .chars()
                        .take(1)
                        .collect::<String>()
                        .to_uppercase(),
                    _ => locale.month_name(sf.month, false).to_string(),
                };
                let d0 = format!("{}{}", pad(sf.day, style), locale.day_suffix);
                let d1 = format!("{}{}", pad(ef.day, style), locale.day_suffix);
                let head = match locale.date_order {
                    DateOrder::Dmy => format!("{d0}{sep}{d1}{}{month}", locale.month_joiner),
                    _ => format!("{month} {d0}{sep}{d1}"),
                };
                return self.finish(append_year(head, o.year.map(|_| sf.year), locale));
            }
            if o.year.is_some() {
                let s = self.date_text(&sf, start.marker.weekday(), locale, false);
                let e = self.date_text(&ef, end.marker.weekday(), locale, false);
                let head = format!("{s}{sep}{e}");
                return self.finish(append_year(head, Some(sf.year), locale));
            }
        }

        self.finish(format!("{start_full}{sep}{end_full}"))
    }
}

fn pad(value: i64, style: NumericStyle) -> String {
    match style {
        NumericStyle::Numeric => value.to_string(),
        NumericStyle::TwoDigit => format!("{value:02}"),
    }
}

fn text_date(locale: &Locale, month: &str, day: Option<String>, year: Option<String>) -> String {
    let day = day.map(|d| format!("{d}{}", locale.day_suffix));
    match locale.date_order {
        DateOrder::Mdy => match (day, year) {
            (Some(d), Some(y)) => format!("{month} {d}, {y}"),
            (Some(d), None) => format!("{month} {d}"),
            (None, Some(y)) => format!("{month} {y}"),
            (None, None) => month.to_string(),
        },
        DateOrder::Dmy => {
            let mut s = match day {
                Some(d) => format!("{d}{}{month}", locale.month_joiner),
                None => month.to_string(),
            };
            if let Some(y) = year {
                s.push_str(locale.month_joiner);
                s.push_str(&y);
            }
            s
        }
        DateOrder::Ymd => [year, Some(month.to_string()), day]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn numeric_date(locale: &Locale, month: String, day: Option<String>, year: Option<String>) -> String {
    let parts = match locale.date_order {
        DateOrder::Mdy => [Some(month), day, year],
        DateOrder::Dmy => [day, Some(month), year],
        DateOrder::Ymd => [year, Some(month), day],
    };
    parts
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(locale.numeric_separator)
}

fn append_year(head: String, year: Option<i64>, locale: &Locale) -> String {
    match (year, locale.date_order) {
        (None, _) => head,
        (Some(y), DateOrder::Mdy) => format!("{head}, {y}"),
        (Some(y), _) => format!("{head}{}{y}", locale.month_joiner),
    }
}

fn join_date_time(date: Option<String>, time: Option<String>, locale: &Locale) -> String {
    match (date, time) {
        (Some(d), Some(t)) => format!("{d}{}{t}", locale.date_time_joiner),
        (Some(d), None) => d,
        (None, Some(t)) => t,
        (None, None) => String::new(),
    }
}

/// "AM" → "am", "p. m." → "pm".
fn compact_meridiem(meridiem: &str) -> String {
    meridiem
        .chars()
        .filter(|c| c.is_alphabetic())
        .collect::<String>()
        .to_lowercase()
}

fn zone_name(minutes: i64) -> String {
    if minutes == 0 {
        return "UTC".to_string();
    }
    let sign = if minutes < 0 { '-' } else { '+' };
    let abs = minutes.abs();
    if abs % 60 == 0 {
        format!("GMT{sign}{}", abs / 60)
    } else {
        format!("GMT{sign}{}:{:02}", abs / 60, abs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{DateEnvSettings, DateInput, RangeFormatOptions, TimeZoneSetting};
    use crate::marker::Marker;

    fn env_for(locale: &str) -> DateEnv {
        DateEnv::new(DateEnvSettings {
            time_zone: TimeZoneSetting::Utc,
            locale: locale.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn mk(env: &DateEnv, s: &str) -> Marker {
        env.create_marker(&DateInput::from(s)).unwrap()
    }

    fn opts(json: &str) -> NativeFormatter {
        NativeFormatter::new(serde_json::from_str(json).unwrap())
    }

    fn range(env: &DateEnv, f: &NativeFormatter, a: &str, b: &str) -> String {
        env.format_range(mk(env, a), mk(env, b), f, &RangeFormatOptions::default())
    }

    #[test]
    fn test_long_dates_per_locale() {
        let f = opts(r#"{"weekday": "long", "month": "long", "day": "numeric", "year": "numeric"}"#);
        let cases = [
            ("en", "Friday, January 5, 2024"),
            ("en-gb", "Friday 5 January 2024"),
            ("de", "Freitag, 5. Januar 2024"),
            ("fr", "vendredi 5 janvier 2024"),
            ("es", "viernes, 5 de enero de 2024"),
        ];
        for (code, expected) in cases {
            let env = env_for(code);
            assert_eq!(env.format(mk(&env, "2024-01-05"), &f, None), expected, "{code}");
        }
    }

    #[test]
    fn test_numeric_dates() {
        let f = NativeFormatter::new(FormatOptions::default());
        let en = env_for("en");
        assert_eq!(en.format(mk(&en, "2024-01-05"), &f, None), "1/5/2024");
        let de = env_for("de");
        assert_eq!(de.format(mk(&de, "2024-01-05"), &f, None), "5.1.2024");

        let header = opts(r#"{"weekday": "short", "month": "numeric", "day": "numeric", "omitCommas": true}"#);
        assert_eq!(en.format(mk(&en, "2024-01-05"), &header, None), "Fri 1/5");
    }

    #[test]
    fn test_times() {
        let en = env_for("en");
        let at = mk(&en, "2024-01-05T21:00:00");
        let default_time = opts(r#"{"hour": "numeric", "minute": "2-digit"}"#);
        assert_eq!(en.format(at, &default_time, None), "9:00 PM");

        let compact = opts(
            r#"{"hour": "numeric", "minute": "2-digit", "omit_zero_minute": true, "meridiem": "short"}"#,
        );
        assert_eq!(en.format(at, &compact, None), "9pm");
        assert_eq!(en.format(at.add_ms(30 * 60_000), &compact, None), "9:30pm");

        let de = env_for("de");
        assert_eq!(de.format(at, &default_time, None), "21:00");

        let zoned = opts(r#"{"hour": "numeric", "minute": "2-digit", "hour12": false, "timeZoneName": "short"}"#);
        assert_eq!(en.format(at, &zoned, Some(120)), "21:00 GMT+2");
        assert_eq!(en.format(at, &zoned, None), "21:00 UTC");
    }

    #[test]
    fn test_week_numbers() {
        let en = env_for("en");
        let m = mk(&en, "2018-01-03");
        assert_eq!(en.format(m, &opts(r#"{"week": "long"}"#), None), "Week 1");
        assert_eq!(en.format(m, &opts(r#"{"week": "narrow"}"#), None), "W1");
        assert_eq!(en.format(m, &opts(r#"{"week": "numeric"}"#), None), "1");
    }

    #[test]
    fn test_range_collapses_shared_fields() {
        let f = opts(r#"{"month": "short", "day": "numeric", "year": "numeric"}"#);
        let en = env_for("en");
        assert_eq!(range(&en, &f, "2024-01-05", "2024-01-09"), "Jan 5 – 9, 2024");
        assert_eq!(range(&en, &f, "2024-01-30", "2024-02-02"), "Jan 30 – Feb 2, 2024");
        assert_eq!(
            range(&en, &f, "2023-12-30", "2024-01-02"),
            "Dec 30, 2023 – Jan 2, 2024"
        );
        assert_eq!(range(&en, &f, "2024-01-05", "2024-01-05T10:00"), "Jan 5, 2024");

        let long = opts(r#"{"month": "long", "day": "numeric", "year": "numeric"}"#);
        let gb = env_for("en-gb");
        assert_eq!(range(&gb, &long, "2024-01-05", "2024-01-09"), "5 – 9 January 2024");
    }

    #[test]
    fn test_range_same_day_times() {
        let f = opts(r#"{"month": "long", "day": "numeric", "hour": "numeric", "minute": "2-digit"}"#);
        let en = env_for("en");
        assert_eq!(
            range(&en, &f, "2024-01-05T09:00", "2024-01-05T11:00"),
            "January 5, 9:00 AM – 11:00 AM"
        );
    }

    #[test]
    fn test_range_end_exclusive() {
        let f = opts(r#"{"month": "short", "day": "numeric"}"#);
        let en = env_for("en");
        let text = en.format_range(
            mk(&en, "2024-03-04"),
            mk(&en, "2024-03-11"),
            &f,
            &RangeFormatOptions {
                is_end_exclusive: true,
                ..Default::default()
            },
        );
        assert_eq!(text, "Mar 4 – 10");
    }
}
