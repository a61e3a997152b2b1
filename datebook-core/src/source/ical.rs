//! iCalendar feeds.
//!
//! The document is fetched once and kept until the source is invalidated.
//! Each request expands the cached components against the requested range:
//! RRULE series are unrolled with EXDATEs removed, and RECURRENCE-ID
//! components replace the occurrence they point at.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use icalendar::DatePerhapsTime;
use icalendar::parser::{Component, Property, read_calendar, unfold};
use reqwest::Url;
use rrule::RRuleSet;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::fetch::{FETCH_TIMEOUT, SingleFlight};
use super::{FetchRequest, SourceFetcher};
use crate::date_range::DateRange;
use crate::env::{DateEnv, DateInput};
use crate::error::{DatebookError, DatebookResult};
use crate::event::{EventInput, IdInput};

/// Cap on occurrences produced for one series and range.
const MAX_OCCURRENCES: u16 = 1000;

const ACCEPT_CALENDAR: &str = "text/calendar, application/ics;q=0.9, */*;q=0.1";

/// A date or date-time value as written in the document.
#[derive(Debug, Clone, PartialEq)]
enum IcalTime {
    Date(NaiveDate),
    Utc(DateTime<Utc>),
    Floating(NaiveDateTime),
    Zoned {
        datetime: NaiveDateTime,
        tzid: String,
    },
}

impl IcalTime {
    fn from_property(prop: &Property) -> Option<Self> {
        DatePerhapsTime::try_from(prop).ok().map(Self::from)
    }

    fn is_date(&self) -> bool {
        matches!(self, IcalTime::Date(_))
    }

    /// Wall-clock value, ignoring any zone.
    fn naive(&self) -> NaiveDateTime {
        match self {
            IcalTime::Date(d) => d.and_time(chrono::NaiveTime::MIN),
            IcalTime::Utc(dt) => dt.naive_utc(),
            IcalTime::Floating(dt) => *dt,
            IcalTime::Zoned { datetime, .. } => *datetime,
        }
    }

    /// The instant, reading floating and unresolvable zoned values as UTC.
    fn instant(&self) -> DateTime<Utc> {
        match self {
            IcalTime::Utc(dt) => *dt,
            IcalTime::Zoned { datetime, tzid } => resolve_zoned(datetime, tzid)
                .unwrap_or_else(|| datetime.and_utc()),
            other => other.naive().and_utc(),
        }
    }

    fn shifted(&self, by: TimeDelta) -> IcalTime {
        match self {
            IcalTime::Date(d) => IcalTime::Date((d.and_time(chrono::NaiveTime::MIN) + by).date()),
            IcalTime::Utc(dt) => IcalTime::Utc(*dt + by),
            IcalTime::Floating(dt) => IcalTime::Floating(*dt + by),
            IcalTime::Zoned { datetime, tzid } => IcalTime::Zoned {
                datetime: *datetime + by,
                tzid: tzid.clone(),
            },
        }
    }

    fn to_date_input(&self) -> DateInput {
        match self {
            IcalTime::Date(d) => DateInput::Text(d.format("%Y-%m-%d").to_string()),
            IcalTime::Utc(dt) => DateInput::from(*dt),
            IcalTime::Floating(dt) => DateInput::Text(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            IcalTime::Zoned { datetime, tzid } => match resolve_zoned(datetime, tzid) {
                Some(instant) => DateInput::from(instant),
                None => {
                    warn!(tzid = %tzid, "Unknown TZID, reading time as floating");
                    DateInput::Text(datetime.format("%Y-%m-%dT%H:%M:%S").to_string())
                }
            },
        }
    }

    /// DTSTART/EXDATE line value for the rrule parser. Dates become midnight UTC.
    fn rrule_value(&self, prop: &str) -> String {
        match self {
            IcalTime::Date(d) => format!("{prop}:{}T000000Z", d.format("%Y%m%d")),
            IcalTime::Utc(dt) => format!("{prop}:{}", dt.format("%Y%m%dT%H%M%SZ")),
            IcalTime::Floating(dt) => format!("{prop}:{}Z", dt.format("%Y%m%dT%H%M%S")),
            IcalTime::Zoned { datetime, tzid } => {
                format!("{prop};TZID={tzid}:{}", datetime.format("%Y%m%dT%H%M%S"))
            }
        }
    }

    /// An rrule occurrence expressed in the same form as the series start.
    fn occurrence(dt: &DateTime<rrule::Tz>, series_start: &IcalTime) -> IcalTime {
        match series_start {
            IcalTime::Date(_) => IcalTime::Date(dt.date_naive()),
            IcalTime::Utc(_) => IcalTime::Utc(dt.with_timezone(&Utc)),
            IcalTime::Floating(_) => IcalTime::Floating(dt.naive_utc()),
            IcalTime::Zoned { tzid, .. } => IcalTime::Zoned {
                datetime: dt.naive_local(),
                tzid: tzid.clone(),
            },
        }
    }
}

impl From<DatePerhapsTime> for IcalTime {
    fn from(dpt: DatePerhapsTime) -> Self {
        match dpt {
            DatePerhapsTime::Date(d) => IcalTime::Date(d),
            DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
                icalendar::CalendarDateTime::Utc(dt) => IcalTime::Utc(dt),
                icalendar::CalendarDateTime::Floating(naive) => IcalTime::Floating(naive),
                icalendar::CalendarDateTime::WithTimezone { date_time, tzid } => {
                    IcalTime::Zoned {
                        datetime: date_time,
                        tzid,
                    }
                }
            },
        }
    }
}

fn resolve_zoned(datetime: &NaiveDateTime, tzid: &str) -> Option<DateTime<Utc>> {
    let tz: chrono_tz::Tz = tzid.parse().ok()?;
    tz.from_local_datetime(datetime)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// One VEVENT, reduced to what becomes event input.
#[derive(Debug, Clone)]
struct IcalEvent {
    uid: String,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    url: Option<String>,
    start: IcalTime,
    end: Option<IcalTime>,
    duration: Option<TimeDelta>,
    cancelled: bool,

    // Recurrence
    rrule: Option<String>,
    exdates: Vec<IcalTime>,
    recurrence_id: Option<IcalTime>,
}

impl IcalEvent {
    fn from_component(vevent: &Component) -> Option<Self> {
        let uid = vevent.find_prop("UID")?.val.to_string();
        let start = IcalTime::from_property(vevent.find_prop("DTSTART")?)?;
        let end = vevent.find_prop("DTEND").and_then(IcalTime::from_property);
        let duration = vevent
            .find_prop("DURATION")
            .and_then(|p| parse_duration(p.val.as_ref()));
        let text = |name: &str| vevent.find_prop(name).map(|p| unescape_text(p.val.as_ref()));

        Some(IcalEvent {
            uid,
            summary: text("SUMMARY"),
            description: text("DESCRIPTION"),
            location: text("LOCATION"),
            url: vevent.find_prop("URL").map(|p| p.val.to_string()),
            start,
            end,
            duration,
            cancelled: vevent
                .find_prop("STATUS")
                .is_some_and(|p| p.val.as_ref() == "CANCELLED"),
            rrule: vevent.find_prop("RRULE").map(|p| p.val.to_string()),
            exdates: vevent
                .properties
                .iter()
                .filter(|p| p.name == "EXDATE")
                .flat_map(parse_exdate_property)
                .collect(),
            recurrence_id: vevent
                .find_prop("RECURRENCE-ID")
                .and_then(IcalTime::from_property),
        })
    }

    fn has_end(&self) -> bool {
        self.end.is_some() || self.duration.is_some()
    }

    /// Length of one occurrence.
    fn span(&self) -> TimeDelta {
        match (&self.end, self.duration) {
            (Some(end), _) => end.naive() - self.start.naive(),
            (None, Some(duration)) => duration,
            (None, None) => TimeDelta::zero(),
        }
    }

    fn to_input(&self, start: &IcalTime) -> EventInput {
        let mut extended_props = Map::new();
        if let Some(location) = &self.location {
            extended_props.insert("location".into(), Value::String(location.clone()));
        }
        if let Some(description) = &self.description {
            extended_props.insert("description".into(), Value::String(description.clone()));
        }
        EventInput {
            id: Some(IdInput::Text(self.uid.clone())),
            title: self.summary.clone(),
            url: self.url.clone(),
            start: Some(start.to_date_input()),
            end: self
                .has_end()
                .then(|| start.shifted(self.span()).to_date_input()),
            all_day: Some(start.is_date()),
            extended_props,
            ..Default::default()
        }
    }

    /// Occurrence starts of a series near `range`, EXDATEs already removed.
    fn occurrences(&self, rrule: &str, range: &DateRange) -> DatebookResult<Vec<IcalTime>> {
        let mut lines = vec![self.start.rrule_value("DTSTART"), format!("RRULE:{rrule}")];
        lines.extend(self.exdates.iter().map(|ex| ex.rrule_value("EXDATE")));

        let rrule_set: RRuleSet = lines.join("\n").parse().map_err(|e| {
            DatebookError::parse(format!("Failed to parse RRULE for event '{}': {}", self.uid, e))
        })?;

        // Markers are wall clock in the caller's zone, so pad a day either side.
        let tz: rrule::Tz = Utc.into();
        let after = (range.start.to_utc() - self.span() - TimeDelta::days(1)).with_timezone(&tz);
        let before = (range.end.to_utc() + TimeDelta::days(1)).with_timezone(&tz);
        let result = rrule_set.after(after).before(before).all(MAX_OCCURRENCES);
        if result.limited {
            warn!(uid = %self.uid, limit = MAX_OCCURRENCES, "Recurrence expansion truncated");
        }
        Ok(result
            .dates
            .iter()
            .map(|dt| IcalTime::occurrence(dt, &self.start))
            .collect())
    }
}

/// Parse an EXDATE property, honouring TZID and VALUE=DATE and comma lists.
fn parse_exdate_property(prop: &Property) -> Vec<IcalTime> {
    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));
    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"));

    prop.val
        .as_ref()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            if is_date {
                NaiveDate::parse_from_str(s, "%Y%m%d").ok().map(IcalTime::Date)
            } else if let Some(tz) = &tzid {
                NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|datetime| IcalTime::Zoned {
                        datetime,
                        tzid: tz.clone(),
                    })
            } else if let Some(s) = s.strip_suffix('Z') {
                NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| IcalTime::Utc(dt.and_utc()))
            } else {
                NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(IcalTime::Floating)
            }
        })
        .collect()
}

fn parse_duration(value: &str) -> Option<TimeDelta> {
    if value.starts_with('-') {
        return None;
    }
    let duration = iso8601::duration(value.trim_start_matches('+')).ok()?;
    let std_duration: std::time::Duration = duration.into();
    TimeDelta::from_std(std_duration).ok()
}

fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn collect_vevents<'c, 'a>(components: &'c [Component<'a>], out: &mut Vec<&'c Component<'a>>) {
    for component in components {
        if component.name == "VEVENT" {
            out.push(component);
        } else {
            collect_vevents(&component.components, out);
        }
    }
}

fn parse_document(text: &str) -> DatebookResult<Vec<IcalEvent>> {
    let unfolded = unfold(text);
    let calendar = read_calendar(&unfolded)
        .map_err(|e| DatebookError::parse(format!("Invalid iCalendar document: {e}")))?;
    let mut vevents = Vec::new();
    collect_vevents(&calendar.components, &mut vevents);

    let events: Vec<IcalEvent> = vevents
        .into_iter()
        .filter_map(|vevent| {
            let event = IcalEvent::from_component(vevent);
            if event.is_none() {
                warn!("Skipping VEVENT without UID or DTSTART");
            }
            event
        })
        .collect();
    debug!(count = events.len(), "Parsed iCalendar document");
    Ok(events)
}

fn overlaps(input: &EventInput, range: &DateRange, env: &DateEnv) -> DatebookResult<bool> {
    let Some(start) = input.start.as_ref() else {
        return Ok(false);
    };
    let start = env.create_marker(start)?;
    let end = match &input.end {
        Some(end) => env.create_marker(end)?,
        None if input.all_day == Some(true) => start.add_days(1),
        None => start,
    };
    Ok(if end <= start {
        range.contains(start)
    } else {
        start < range.end && end > range.start
    })
}

fn expand_events(events: &[IcalEvent], range: &DateRange, env: &DateEnv) -> Vec<EventInput> {
    let overridden: HashSet<(&str, i64)> = events
        .iter()
        .filter_map(|e| {
            let rid = e.recurrence_id.as_ref()?;
            Some((e.uid.as_str(), rid.instant().timestamp_millis()))
        })
        .collect();

    let mut inputs = Vec::new();
    for event in events.iter().filter(|e| !e.cancelled) {
        let starts = match (&event.rrule, &event.recurrence_id) {
            (Some(rrule), None) => match event.occurrences(rrule, range) {
                Ok(starts) => starts
                    .into_iter()
                    .filter(|s| {
                        !overridden.contains(&(event.uid.as_str(), s.instant().timestamp_millis()))
                    })
                    .collect(),
                Err(e) => {
                    warn!(uid = %event.uid, error = %e, "Keeping only the first occurrence");
                    vec![event.start.clone()]
                }
            },
            _ => vec![event.start.clone()],
        };

        for start in starts {
            let input = event.to_input(&start);
            match overlaps(&input, range, env) {
                Ok(true) => inputs.push(input),
                Ok(false) => {}
                Err(e) => warn!(uid = %event.uid, error = %e, "Skipping unreadable occurrence"),
            }
        }
    }
    inputs
}

/// Parse an iCalendar document and expand it into event input for `range`.
pub fn expand_ical_document(
    text: &str,
    range: &DateRange,
    env: &DateEnv,
) -> DatebookResult<Vec<EventInput>> {
    Ok(expand_events(&parse_document(text)?, range, env))
}

#[derive(Debug, Clone)]
enum Location {
    Remote(Url),
    Path(PathBuf),
}

impl Location {
    fn parse(location: &str) -> DatebookResult<Self> {
        let trimmed = location.trim();
        if trimmed.is_empty() {
            return Err(DatebookError::Config("Calendar location is empty".into()));
        }
        let lower = trimmed.to_ascii_lowercase();
        let remote = if lower.starts_with("webcal://") || lower.starts_with("webcals://") {
            let rest = trimmed.split_once("://").map_or(trimmed, |(_, rest)| rest);
            debug!(location = %trimmed, "Rewrote webcal URL to https");
            format!("https://{rest}")
        } else if lower.starts_with("http://") || lower.starts_with("https://") {
            trimmed.to_string()
        } else if let Some(path) = trimmed.strip_prefix("file://") {
            return Ok(Location::Path(PathBuf::from(path)));
        } else {
            return Ok(Location::Path(PathBuf::from(trimmed)));
        };
        Url::parse(&remote)
            .map(Location::Remote)
            .map_err(|e| DatebookError::Config(format!("Invalid calendar URL '{trimmed}': {e}")))
    }

    async fn read(&self, client: &reqwest::Client) -> DatebookResult<String> {
        match self {
            Location::Path(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                DatebookError::Fetch(format!("Failed to read {}: {}", path.display(), e))
            }),
            Location::Remote(url) => {
                let response = client
                    .get(url.clone())
                    .header(reqwest::header::ACCEPT, ACCEPT_CALENDAR)
                    .header(reqwest::header::CACHE_CONTROL, "no-cache")
                    .send()
                    .await
                    .map_err(|e| DatebookError::Fetch(format!("Request to {url} failed: {e}")))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(DatebookError::Fetch(format!(
                        "Calendar {url} answered with status {status}"
                    )));
                }
                response
                    .text()
                    .await
                    .map_err(|e| DatebookError::Fetch(format!("Failed to read {url}: {e}")))
            }
        }
    }
}

/// An iCalendar document at a URL or on disk.
#[derive(Debug, Clone)]
pub struct IcalFeedFetcher {
    location: Location,
    client: reqwest::Client,
    document: SingleFlight<(), Arc<Vec<IcalEvent>>>,
}

impl IcalFeedFetcher {
    pub fn new(location: &str) -> DatebookResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| DatebookError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(IcalFeedFetcher {
            location: Location::parse(location)?,
            client,
            document: SingleFlight::new(),
        })
    }
}

#[async_trait]
impl SourceFetcher for IcalFeedFetcher {
    fn kind(&self) -> &'static str {
        "ical"
    }

    async fn fetch(&self, request: &FetchRequest) -> DatebookResult<Vec<EventInput>> {
        let location = self.location.clone();
        let client = self.client.clone();
        let events = self
            .document
            .run((), true, move || async move {
                let text = location.read(&client).await?;
                parse_document(&text).map(Arc::new)
            })
            .await?;
        debug!(source = %request.source_id, components = events.len(), "Expanding iCalendar feed");
        Ok(expand_events(&events, &request.range, &request.env))
    }

    async fn invalidate(&self) {
        self.document.invalidate(&()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VEVENT\r\n\
UID:standup\r\n\
SUMMARY:Standup\r\n\
LOCATION:Room 4\\, east wing\r\n\
DTSTART:20240101T090000Z\r\n\
DTEND:20240101T091500Z\r\n\
RRULE:FREQ=WEEKLY;BYDAY=MO\r\n\
EXDATE:20240108T090000Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:standup\r\n\
RECURRENCE-ID:20240115T090000Z\r\n\
SUMMARY:Standup (moved)\r\n\
DTSTART:20240116T100000Z\r\n\
DTEND:20240116T101500Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:offsite\r\n\
SUMMARY:Offsite\r\n\
DTSTART;VALUE=DATE:20240124\r\n\
DTEND;VALUE=DATE:20240126\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:call\r\n\
SUMMARY:Call\r\n\
DTSTART:20240110T150000Z\r\n\
DURATION:PT30M\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    fn january(env: &DateEnv) -> DateRange {
        DateRange::new(
            env.create_marker(&DateInput::from("2024-01-01")).unwrap(),
            env.create_marker(&DateInput::from("2024-02-01")).unwrap(),
        )
        .unwrap()
    }

    fn starts(inputs: &[EventInput], env: &DateEnv) -> Vec<String> {
        let mut out: Vec<String> = inputs
            .iter()
            .map(|i| {
                let m = env.create_marker(i.start.as_ref().unwrap()).unwrap();
                format!("{} {}", i.title.as_deref().unwrap_or(""), m)
            })
            .collect();
        out.sort();
        out
    }

    #[test]
    fn test_weekly_series_with_exdate_and_override() {
        let env = DateEnv::utc();
        let inputs = expand_ical_document(DOCUMENT, &january(&env), &env).unwrap();
        let standups: Vec<&EventInput> = inputs
            .iter()
            .filter(|i| i.id == Some(IdInput::Text("standup".into())))
            .collect();
        // Jan 1, 22, 29 from the series, Jan 8 excluded, Jan 15 moved to the 16th
        assert_eq!(standups.len(), 4);
        let listed = starts(&inputs, &env);
        assert!(listed.iter().any(|s| s.starts_with("Standup (moved) 2024-01-16T10:00")));
        assert!(!listed.iter().any(|s| s.contains("2024-01-08")));
        assert!(!listed.iter().any(|s| s.starts_with("Standup 2024-01-15")));

        let first = standups
            .iter()
            .find(|i| i.start == Some(DateInput::Timestamp(1_704_099_600_000)))
            .unwrap();
        assert_eq!(first.all_day, Some(false));
        assert_eq!(first.end, Some(DateInput::Timestamp(1_704_100_500_000)));
        assert_eq!(
            first.extended_props.get("location"),
            Some(&Value::String("Room 4, east wing".into()))
        );
    }

    #[test]
    fn test_all_day_and_duration_events() {
        let env = DateEnv::utc();
        let inputs = expand_ical_document(DOCUMENT, &january(&env), &env).unwrap();

        let offsite = inputs
            .iter()
            .find(|i| i.title.as_deref() == Some("Offsite"))
            .unwrap();
        assert_eq!(offsite.all_day, Some(true));
        assert_eq!(offsite.start, Some(DateInput::from("2024-01-24")));
        assert_eq!(offsite.end, Some(DateInput::from("2024-01-26")));

        let call = inputs
            .iter()
            .find(|i| i.title.as_deref() == Some("Call"))
            .unwrap();
        let start = env.create_marker(call.start.as_ref().unwrap()).unwrap();
        let end = env.create_marker(call.end.as_ref().unwrap()).unwrap();
        assert_eq!(start.diff_ms(end), 30 * 60 * 1000);
    }

    #[test]
    fn test_range_filters_occurrences() {
        let env = DateEnv::utc();
        let range = DateRange::new(
            env.create_marker(&DateInput::from("2024-01-20")).unwrap(),
            env.create_marker(&DateInput::from("2024-01-25")).unwrap(),
        )
        .unwrap();
        let inputs = expand_ical_document(DOCUMENT, &range, &env).unwrap();
        let mut titles: Vec<&str> = inputs.iter().filter_map(|i| i.title.as_deref()).collect();
        titles.sort();
        assert_eq!(titles, vec!["Offsite", "Standup"]);
    }

    #[test]
    fn test_zoned_start_resolves_to_instant() {
        let doc = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VEVENT\r\n\
UID:ny\r\n\
SUMMARY:Lunch\r\n\
DTSTART;TZID=America/New_York:20240105T120000\r\n\
DTEND;TZID=America/New_York:20240105T130000\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";
        let env = DateEnv::utc();
        let inputs = expand_ical_document(doc, &january(&env), &env).unwrap();
        assert_eq!(inputs.len(), 1);
        let start = env.create_marker(inputs[0].start.as_ref().unwrap()).unwrap();
        assert_eq!(start.to_string(), "2024-01-05T17:00:00.000");
    }

    #[test]
    fn test_webcal_is_fetched_over_https() {
        match Location::parse("webcal://example.com/cal.ics").unwrap() {
            Location::Remote(url) => assert_eq!(url.as_str(), "https://example.com/cal.ics"),
            other => panic!("Expected remote location, got {:?}", other),
        }
        assert!(matches!(
            Location::parse("/tmp/cal.ics").unwrap(),
            Location::Path(_)
        ));
        assert!(Location::parse("  ").is_err());
    }

    #[tokio::test]
    async fn test_local_document_is_cached_until_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cal.ics");
        std::fs::write(&path, DOCUMENT).unwrap();

        let fetcher = IcalFeedFetcher::new(path.to_str().unwrap()).unwrap();
        let env = DateEnv::utc();
        let request = FetchRequest {
            source_id: "team".into(),
            range: january(&env),
            env,
        };
        let first = fetcher.fetch(&request).await.unwrap();
        assert!(!first.is_empty());

        std::fs::remove_file(&path).unwrap();
        let cached = fetcher.fetch(&request).await.unwrap();
        assert_eq!(cached.len(), first.len());

        fetcher.invalidate().await;
        assert!(matches!(
            fetcher.fetch(&request).await,
            Err(DatebookError::Fetch(_))
        ));
    }
}
