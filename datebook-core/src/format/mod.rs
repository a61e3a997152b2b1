//! Date formatting.
//!
//! Three formatter kinds share the [`DateFormatter`] interface: structured
//! options ([`NativeFormatter`]), command-string templates
//! ([`CommandFormatter`]) and caller callbacks ([`CallbackFormatter`]).

mod cmd;
mod func;
mod native;

pub use cmd::CommandFormatter;
pub use func::{CallbackFormatter, FormatCallback};
pub use native::{
    FormatOptions, MeridiemStyle, MonthStyle, NativeFormatter, NumericStyle, TextStyle,
    TimeZoneNameStyle, WeekStyle,
};

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::calendar_system::CalendarSystem;
use crate::env::DateEnv;
use crate::marker::Marker;

/// A marker plus the offset it should be displayed with, if known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZonedMarker {
    pub marker: Marker,
    pub time_zone_offset: Option<i64>,
}

/// A zoned marker with its calendar fields spelled out. Months are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpandedZonedMarker {
    pub marker: Marker,
    pub year: i64,
    pub month: i64,
    pub day: i64,
    pub hour: i64,
    pub minute: i64,
    pub second: i64,
    pub millisecond: i64,
    pub time_zone_offset: Option<i64>,
}

impl ExpandedZonedMarker {
    pub fn expand(date: &ZonedMarker, calendar: &dyn CalendarSystem) -> Self {
        let f = calendar.marker_to_array(date.marker);
        ExpandedZonedMarker {
            marker: date.marker,
            year: f.year,
            month: f.month,
            day: f.day,
            hour: f.hour,
            minute: f.minute,
            second: f.second,
            millisecond: f.millisecond,
            time_zone_offset: date.time_zone_offset,
        }
    }
}

/// Everything a callback formatter gets to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerboseFormattingArg {
    pub date: ExpandedZonedMarker,
    pub start: ExpandedZonedMarker,
    pub end: Option<ExpandedZonedMarker>,
    pub time_zone: String,
    pub locale_codes: Vec<String>,
    pub default_separator: String,
}

impl VerboseFormattingArg {
    pub fn new(start: &ZonedMarker, end: Option<&ZonedMarker>, env: &DateEnv) -> Self {
        let start = ExpandedZonedMarker::expand(start, env.calendar());
        VerboseFormattingArg {
            date: start.clone(),
            start,
            end: end.map(|e| ExpandedZonedMarker::expand(e, env.calendar())),
            time_zone: env.time_zone().to_string(),
            locale_codes: env.locale_codes(),
            default_separator: env.default_separator().to_string(),
        }
    }
}

pub trait DateFormatter: Send + Sync + fmt::Debug {
    fn format(&self, date: &ZonedMarker, env: &DateEnv) -> String;

    /// Format a range, collapsing the parts both ends share.
    fn format_range(
        &self,
        start: &ZonedMarker,
        end: &ZonedMarker,
        env: &DateEnv,
        separator: &str,
    ) -> String;
}

/// What a formatter can be built from.
#[derive(Clone)]
pub enum FormatterInput {
    Options(FormatOptions),
    Command(String),
    Callback(FormatCallback),
}

impl fmt::Debug for FormatterInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatterInput::Options(o) => f.debug_tuple("Options").field(o).finish(),
            FormatterInput::Command(c) => f.debug_tuple("Command").field(c).finish(),
            FormatterInput::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl FormatterInput {
    /// A JSON object becomes structured options, anything else a command string.
    pub fn from_text(text: &str) -> Self {
        match serde_json::from_str::<FormatOptions>(text) {
            Ok(options) => FormatterInput::Options(options),
            Err(_) => FormatterInput::Command(text.to_string()),
        }
    }
}

impl From<FormatOptions> for FormatterInput {
    fn from(options: FormatOptions) -> Self {
        FormatterInput::Options(options)
    }
}

impl From<&str> for FormatterInput {
    fn from(cmd: &str) -> Self {
        FormatterInput::Command(cmd.to_string())
    }
}

impl From<String> for FormatterInput {
    fn from(cmd: String) -> Self {
        FormatterInput::Command(cmd)
    }
}

pub fn create_formatter(input: impl Into<FormatterInput>) -> Arc<dyn DateFormatter> {
    match input.into() {
        FormatterInput::Options(options) => Arc::new(NativeFormatter::new(options)),
        FormatterInput::Command(cmd) => Arc::new(CommandFormatter::new(cmd)),
        FormatterInput::Callback(callback) => Arc::new(CallbackFormatter::new(callback)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::DateInput;

    #[test]
    fn test_from_text_picks_kind() {
        assert!(matches!(
            FormatterInput::from_text(r#"{"month": "long"}"#),
            FormatterInput::Options(_)
        ));
        assert!(matches!(
            FormatterInput::from_text("{MMMM {D}}, YYYY"),
            FormatterInput::Command(_)
        ));
    }

    #[test]
    fn test_verbose_arg_expands_fields() {
        let env = DateEnv::utc();
        let m = env
            .create_marker(&DateInput::from("2024-03-09T17:05:00"))
            .unwrap();
        let arg = VerboseFormattingArg::new(&env.zoned(m, None), None, &env);
        assert_eq!((arg.date.year, arg.date.month, arg.date.day), (2024, 3, 9));
        assert_eq!((arg.date.hour, arg.date.minute), (17, 5));
        assert_eq!(arg.date.time_zone_offset, Some(0));
        assert_eq!(arg.time_zone, "UTC");
        assert_eq!(arg.locale_codes, vec!["en".to_string()]);
        assert!(arg.end.is_none());
    }
}
