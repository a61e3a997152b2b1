//! ISO-8601-like date string grammar.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveTime};
use regex::{Captures, Regex};

use crate::error::{DatebookError, DatebookResult};
use crate::marker::Marker;

/// Result of parsing a date string, before any time zone is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDate {
    /// The written wall-clock fields.
    pub marker: Marker,
    pub is_time_unspecified: bool,
    /// Minutes east of UTC when the string carried `Z` or `±HH:mm`.
    pub time_zone_offset: Option<i64>,
}

fn iso_re() -> DatebookResult<&'static Regex> {
    static ISO_RE: OnceLock<Result<Regex, String>> = OnceLock::new();
    ISO_RE
        .get_or_init(|| {
            Regex::new(
                r"^\s*(\d{4})(-?(\d{2})(-?(\d{2})([T ](\d{2}):?(\d{2})(:?(\d{2})(\.(\d+))?)?(Z|(([-+])(\d{2})(:?(\d{2}))?))?)?)?)?\s*$",
            )
            .map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| DatebookError::parse(format!("Date grammar failed to compile: {e}")))
}

/// Parse `YYYY[-MM[-DD[THH:mm[:ss[.sss]][Z|±HH[:mm]]]]]`.
///
/// Field values are validated: `2018-02-30` and `25:00` are errors rather
/// than rolling over.
pub fn parse_iso(input: &str) -> DatebookResult<ParsedDate> {
    let caps = iso_re()?
        .captures(input)
        .ok_or_else(|| DatebookError::parse(format!("Unrecognized date '{input}'")))?;

    let year = group_num(&caps, 1).unwrap_or(0);
    let month = group_num(&caps, 3).unwrap_or(1);
    let day = group_num(&caps, 5).unwrap_or(1);
    let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .ok_or_else(|| DatebookError::parse(format!("Date out of range in '{input}'")))?;

    let is_time_unspecified = caps.get(6).is_none();
    let hour = group_num(&caps, 7).unwrap_or(0);
    let minute = group_num(&caps, 8).unwrap_or(0);
    let second = group_num(&caps, 10).unwrap_or(0);
    let millis = caps.get(12).map(|m| fraction_to_millis(m.as_str())).unwrap_or(0);
    let time = NaiveTime::from_hms_milli_opt(hour as u32, minute as u32, second as u32, millis)
        .ok_or_else(|| DatebookError::parse(format!("Time out of range in '{input}'")))?;

    let time_zone_offset = match caps.get(13).map(|m| m.as_str()) {
        None => None,
        Some("Z") => Some(0),
        Some(_) => {
            let sign = if caps.get(15).map(|m| m.as_str()) == Some("-") {
                -1
            } else {
                1
            };
            let hours = group_num(&caps, 16).unwrap_or(0);
            let minutes = group_num(&caps, 18).unwrap_or(0);
            if hours > 23 || minutes > 59 {
                return Err(DatebookError::parse(format!(
                    "Offset out of range in '{input}'"
                )));
            }
            Some(sign * (hours * 60 + minutes))
        }
    };

    Ok(ParsedDate {
        marker: Marker::from_naive(date.and_time(time)),
        is_time_unspecified,
        time_zone_offset,
    })
}

fn group_num(caps: &Captures<'_>, i: usize) -> Option<i64> {
    caps.get(i).and_then(|m| m.as_str().parse().ok())
}

/// `.5` is half a second; digits past milliseconds are dropped.
fn fraction_to_millis(digits: &str) -> u32 {
    let mut padded: String = digits.chars().take(3).collect();
    while padded.len() < 3 {
        padded.push('0');
    }
    padded.parse().unwrap_or(0)
}
