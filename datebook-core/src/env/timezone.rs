//! Time-zone settings and pluggable named-zone resolution.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Local, Offset, TimeZone};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DatebookError;
use crate::marker::{MS_PER_MINUTE, Marker};

/// Which zone wall-clock markers are interpreted in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum TimeZoneSetting {
    /// The host's local zone.
    #[default]
    Local,
    Utc,
    /// An IANA zone name, resolved through a [`TimeZoneProvider`].
    Named(String),
}

impl TimeZoneSetting {
    pub fn as_str(&self) -> &str {
        match self {
            TimeZoneSetting::Local => "local",
            TimeZoneSetting::Utc => "UTC",
            TimeZoneSetting::Named(name) => name,
        }
    }
}

impl fmt::Display for TimeZoneSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeZoneSetting {
    type Err = DatebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DatebookError::Config("Empty time zone".to_string()));
        }
        Ok(if s.eq_ignore_ascii_case("local") {
            TimeZoneSetting::Local
        } else if s.eq_ignore_ascii_case("utc") {
            TimeZoneSetting::Utc
        } else {
            TimeZoneSetting::Named(s.to_string())
        })
    }
}

impl Serialize for TimeZoneSetting {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TimeZoneSetting {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Offset computations for one zone. Offsets are minutes east of UTC.
pub trait NamedTimeZoneImpl: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Offset in effect at the given real instant.
    fn offset_for_timestamp(&self, ms: i64) -> i64;

    /// Offset for a wall-clock marker in this zone. Ambiguous times take the
    /// earlier offset, skipped times the offset in effect just before the gap.
    fn offset_for_marker(&self, marker: Marker) -> i64;

    fn timestamp_to_marker(&self, ms: i64) -> Marker {
        Marker::from_millis(ms).add_ms(self.offset_for_timestamp(ms) * MS_PER_MINUTE)
    }
}

/// Resolves zone names to implementations.
pub trait TimeZoneProvider: Send + Sync + fmt::Debug {
    fn resolve(&self, name: &str) -> Option<Arc<dyn NamedTimeZoneImpl>>;
}

/// The tz database bundled by `chrono-tz`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChronoTzProvider;

impl TimeZoneProvider for ChronoTzProvider {
    fn resolve(&self, name: &str) -> Option<Arc<dyn NamedTimeZoneImpl>> {
        let tz: chrono_tz::Tz = name.parse().ok()?;
        Some(Arc::new(ChronoZone { tz }))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChronoZone {
    tz: chrono_tz::Tz,
}

impl ChronoZone {
    pub fn new(tz: chrono_tz::Tz) -> Self {
        ChronoZone { tz }
    }
}

impl NamedTimeZoneImpl for ChronoZone {
    fn name(&self) -> &str {
        self.tz.name()
    }

    fn offset_for_timestamp(&self, ms: i64) -> i64 {
        zone_offset_at(&self.tz, ms)
    }

    fn offset_for_marker(&self, marker: Marker) -> i64 {
        zone_offset_for_wall_clock(&self.tz, marker)
    }
}

/// The host zone, through `chrono::Local`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostLocalZone;

impl NamedTimeZoneImpl for HostLocalZone {
    fn name(&self) -> &str {
        "local"
    }

    fn offset_for_timestamp(&self, ms: i64) -> i64 {
        zone_offset_at(&Local, ms)
    }

    fn offset_for_marker(&self, marker: Marker) -> i64 {
        zone_offset_for_wall_clock(&Local, marker)
    }
}

fn zone_offset_at<Tz: TimeZone>(tz: &Tz, ms: i64) -> i64 {
    let utc = Marker::from_millis(ms).to_naive();
    i64::from(tz.offset_from_utc_datetime(&utc).fix().local_minus_utc()) / 60
}

fn zone_offset_for_wall_clock<Tz: TimeZone>(tz: &Tz, marker: Marker) -> i64 {
    let naive = marker.to_naive();
    let offset = match tz.from_local_datetime(&naive).earliest() {
        Some(dt) => dt.offset().fix(),
        // inside a DST gap: use the offset from before the transition
        None => tz.offset_from_utc_datetime(&naive).fix(),
    };
    i64::from(offset.local_minus_utc()) / 60
}

/// `+05:30` style offset text. `compact` drops the colon.
pub fn format_offset(minutes: i64, compact: bool) -> String {
    let sign = if minutes < 0 { '-' } else { '+' };
    let abs = minutes.abs();
    if compact {
        format!("{sign}{:02}{:02}", abs / 60, abs % 60)
    } else {
        format!("{sign}{:02}:{:02}", abs / 60, abs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn marker(y: i32, mo: u32, d: u32, h: u32) -> Marker {
        Marker::from_naive(
            NaiveDate::from_ymd_opt(y, mo, d)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn test_setting_from_str() {
        assert_eq!("local".parse::<TimeZoneSetting>().unwrap(), TimeZoneSetting::Local);
        assert_eq!("UTC".parse::<TimeZoneSetting>().unwrap(), TimeZoneSetting::Utc);
        assert_eq!(
            "Europe/Berlin".parse::<TimeZoneSetting>().unwrap(),
            TimeZoneSetting::Named("Europe/Berlin".to_string())
        );
        assert!("".parse::<TimeZoneSetting>().is_err());
    }

    #[test]
    fn test_chrono_tz_offsets() {
        let zone = ChronoTzProvider.resolve("America/New_York").unwrap();
        assert_eq!(zone.offset_for_marker(marker(2024, 1, 15, 12)), -300);
        assert_eq!(zone.offset_for_marker(marker(2024, 7, 15, 12)), -240);
        // 02:00 does not exist on 2024-03-10 in New York
        assert_eq!(zone.offset_for_marker(marker(2024, 3, 10, 2)), -300);
        assert!(ChronoTzProvider.resolve("Mars/Olympus").is_none());
    }

    #[test]
    fn test_timestamp_to_marker_applies_offset() {
        let zone = ChronoTzProvider.resolve("Europe/Berlin").unwrap();
        let instant = marker(2024, 7, 1, 10).millis();
        assert_eq!(zone.timestamp_to_marker(instant), marker(2024, 7, 1, 12));
    }

    #[test]
    fn test_format_offset() {
        assert_eq!(format_offset(330, false), "+05:30");
        assert_eq!(format_offset(-300, true), "-0500");
        assert_eq!(format_offset(0, false), "+00:00");
    }
}
