//! Turning [`EventInput`]s into definitions and instances.

use serde_json::Value;
use tracing::{trace, warn};
use uuid::Uuid;

use super::def::{EventDef, EventUi, RecurringDef};
use super::input::{EventInput, IdInput};
use super::instance::EventInstance;
use super::recurrence::RecurrenceRule;
use super::store::EventStore;
use crate::date_range::DateRange;
use crate::duration::Duration;
use crate::env::DateEnv;
use crate::error::{DatebookError, DatebookResult};
use crate::marker::Marker;
use crate::options::CalendarOptions;

/// Defaults applied while parsing, from the calendar options with
/// per-source overrides on top.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseSettings {
    pub default_all_day: Option<bool>,
    pub default_all_day_event_duration: Duration,
    pub default_timed_event_duration: Duration,
    pub force_event_duration: bool,
    /// UI defaults every event of the source starts from.
    pub source_ui: EventUi,
}

impl ParseSettings {
    pub fn from_options(options: &CalendarOptions) -> Self {
        ParseSettings {
            default_all_day: options.default_all_day,
            default_all_day_event_duration: options.default_all_day_event_duration,
            default_timed_event_duration: options.default_timed_event_duration,
            force_event_duration: options.force_event_duration,
            source_ui: EventUi::default(),
        }
    }

    pub fn with_source_default_all_day(mut self, default_all_day: Option<bool>) -> Self {
        if default_all_day.is_some() {
            self.default_all_day = default_all_day;
        }
        self
    }

    pub fn with_source_ui(mut self, ui: EventUi) -> Self {
        self.source_ui = ui;
        self
    }

    /// End of an event that has none of its own. Never before `start`.
    pub fn default_end(&self, env: &DateEnv, all_day: bool, start: Marker) -> Marker {
        let end = if all_day {
            env.add(start.start_of_day(), &self.default_all_day_event_duration)
        } else {
            env.add(start, &self.default_timed_event_duration)
        };
        end.max(start)
    }

    pub fn default_duration(&self, all_day: bool) -> Duration {
        if all_day {
            self.default_all_day_event_duration
        } else {
            self.default_timed_event_duration
        }
    }
}

/// What a single input turned into.
#[derive(Debug, Clone)]
pub struct ParsedEvent {
    pub def: EventDef,
    /// `None` for recurring definitions; their instances come from expansion.
    pub instance: Option<EventInstance>,
}

/// Parse one input. Fails with `Parse` when the input has no usable start or
/// carries malformed dates.
pub fn parse_event(
    input: EventInput,
    source_id: Option<&str>,
    env: &DateEnv,
    settings: &ParseSettings,
) -> DatebookResult<ParsedEvent> {
    let rule_input = input.recurrence_rule();
    if !rule_input.is_empty() {
        let start_recur = rule_input
            .start_recur
            .as_ref()
            .map(|d| env.create_marker(d))
            .transpose()?;
        let end_recur = rule_input
            .end_recur
            .as_ref()
            .map(|d| env.create_marker(d))
            .transpose()?;
        let rule = RecurrenceRule::new(
            rule_input.days_of_week.as_deref(),
            rule_input.start_time,
            rule_input.end_time,
            start_recur,
            end_recur,
        )?;
        let all_day = input
            .all_day
            .or(settings.default_all_day)
            .unwrap_or(rule.start_time.is_none() && rule.end_time.is_none());
        let duration = match input.duration.or_else(|| rule.implied_duration()) {
            Some(d) if d.as_roughly_ms() < 0 => {
                warn!(duration = %d, "Negative recurring event duration, using the default");
                None
            }
            d => d.filter(|d| !d.is_zero()),
        };
        let def = build_def(
            input,
            source_id,
            all_day,
            duration.is_some(),
            Some(RecurringDef { rule, duration }),
            settings,
        );
        return Ok(ParsedEvent {
            def,
            instance: None,
        });
    }

    let start_input = input
        .start_input()
        .ok_or_else(|| DatebookError::parse("Event has no start"))?;
    let start_meta = env.create_marker_meta(start_input)?;
    let end_meta = input
        .end
        .as_ref()
        .map(|e| env.create_marker_meta(e))
        .transpose()?;

    let all_day = input.all_day.or(settings.default_all_day).unwrap_or_else(|| {
        start_meta.is_time_unspecified && end_meta.is_none_or(|e| e.is_time_unspecified)
    });

    let mut start = start_meta.marker;
    if all_day {
        start = start.start_of_day();
    }
    let mut end = end_meta.map(|e| {
        if all_day {
            e.marker.start_of_day()
        } else {
            e.marker
        }
    });
    if end.is_some_and(|e| e <= start) {
        end = None;
    }
    let has_end = end.is_some() || settings.force_event_duration;
    let end = end.unwrap_or_else(|| settings.default_end(env, all_day, start));

    let def = build_def(input, source_id, all_day, has_end, None, settings);
    let instance = EventInstance::new(def.def_id.clone(), DateRange { start, end })
        .with_forced_offsets(start_meta.forced_tzo, end_meta.and_then(|e| e.forced_tzo));
    Ok(ParsedEvent {
        def,
        instance: Some(instance),
    })
}

fn build_def(
    input: EventInput,
    source_id: Option<&str>,
    all_day: bool,
    has_end: bool,
    recurring: Option<RecurringDef>,
    settings: &ParseSettings,
) -> EventDef {
    let EventInput {
        id,
        group_id,
        title,
        url,
        display,
        editable,
        start_editable,
        duration_editable,
        overlap,
        color,
        background_color,
        border_color,
        text_color,
        class_names,
        mut extended_props,
        extra,
        ..
    } = input;

    let ui = EventUi {
        display,
        start_editable: start_editable.or(editable),
        duration_editable: duration_editable.or(editable),
        overlap,
        background_color: background_color.or_else(|| color.clone()),
        border_color: border_color.or(color),
        text_color,
        class_names: class_names.map(|c| c.into_vec()).unwrap_or_default(),
    };

    for (key, value) in extra {
        if !matches!(value, Value::Null) {
            extended_props.entry(key).or_insert(value);
        }
    }

    EventDef {
        def_id: Uuid::new_v4().to_string(),
        source_id: source_id.map(str::to_string),
        public_id: id.map(IdInput::into_string),
        group_id: group_id.map(IdInput::into_string),
        title: title.unwrap_or_default(),
        url,
        all_day,
        has_end,
        recurring,
        ui: settings.source_ui.merge(&ui),
        extended_props,
    }
}

/// Parse a batch into a store, skipping malformed inputs with a warning.
/// Recurring definitions are expanded over `framing` when given.
pub fn parse_events(
    inputs: Vec<EventInput>,
    source_id: Option<&str>,
    env: &DateEnv,
    settings: &ParseSettings,
    framing: Option<&DateRange>,
) -> EventStore {
    let mut store = EventStore::new();
    let total = inputs.len();
    for (idx, input) in inputs.into_iter().enumerate() {
        match parse_event(input, source_id, env, settings) {
            Ok(ParsedEvent { def, instance }) => {
                store = store.add(def, instance);
            }
            Err(e) => {
                warn!(source = source_id.unwrap_or("-"), index = idx, "Ignoring event input: {e}");
            }
        }
    }
    trace!(source = source_id.unwrap_or("-"), parsed = store.defs().len(), total, "Parsed events");
    match framing {
        Some(window) => store.expand_recurring(window, env, settings),
        None => store,
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

    fn input(json: serde_json::Value) -> EventInput {
        serde_json::from_value(json).unwrap()
    }

    fn settings() -> ParseSettings {
        ParseSettings::from_options(&CalendarOptions::default())
    }

    #[test]
    fn test_all_day_guessed_from_dates() {
        let env = DateEnv::utc();
        let parsed = parse_event(
            input(serde_json::json!({"title": "Trip", "start": "2024-01-05", "end": "2024-01-07"})),
            None,
            &env,
            &settings(),
        )
        .unwrap();
        assert!(parsed.def.all_day);
        assert!(parsed.def.has_end);
        let instance = parsed.instance.unwrap();
        assert_eq!(instance.range.start, mk("2024-01-05"));
        assert_eq!(instance.range.end, mk("2024-01-07"));
    }

    #[test]
    fn test_timed_default_end() {
        let env = DateEnv::utc();
        let parsed = parse_event(
            input(serde_json::json!({"start": "2024-01-05T10:30:00", "end": "2024-01-05T09:00:00"})),
            Some("src"),
            &env,
            &settings(),
        )
        .unwrap();
        assert!(!parsed.def.all_day);
        // an end before the start is dropped
        assert!(!parsed.def.has_end);
        assert_eq!(parsed.def.source_id.as_deref(), Some("src"));
        let range = parsed.instance.unwrap().range;
        assert_eq!(range.start.diff_ms(range.end), MS_PER_HOUR);
    }

    #[test]
    fn test_explicit_all_day_snaps_times() {
        let env = DateEnv::utc();
        let parsed = parse_event(
            input(serde_json::json!({"start": "2024-01-05T10:30:00", "allDay": true})),
            None,
            &env,
            &settings(),
        )
        .unwrap();
        let range = parsed.instance.unwrap().range;
        assert_eq!(range.start, mk("2024-01-05"));
        assert_eq!(range.end, mk("2024-01-06"));
    }

    #[test]
    fn test_forced_offset_kept_without_zone() {
        let env = DateEnv::new(crate::env::DateEnvSettings {
            time_zone: crate::env::TimeZoneSetting::Named("Mars/Olympus".into()),
            ..Default::default()
        })
        .unwrap();
        let parsed = parse_event(
            input(serde_json::json!({"start": "2024-01-05T10:00:00-05:00"})),
            None,
            &env,
            &settings(),
        )
        .unwrap();
        let instance = parsed.instance.unwrap();
        assert_eq!(instance.forced_start_tzo, Some(-300));
        assert_eq!(instance.range.start, mk("2024-01-05T10:00:00"));
    }

    #[test]
    fn test_ui_props_and_extras() {
        let env = DateEnv::utc();
        let parsed = parse_event(
            input(serde_json::json!({
                "id": 7,
                "start": "2024-01-05",
                "color": "red",
                "textColor": "white",
                "editable": false,
                "durationEditable": true,
                "room": "4B"
            })),
            None,
            &env,
            &settings(),
        )
        .unwrap();
        let def = parsed.def;
        assert_eq!(def.public_id.as_deref(), Some("7"));
        assert_eq!(def.ui.background_color.as_deref(), Some("red"));
        assert_eq!(def.ui.border_color.as_deref(), Some("red"));
        assert_eq!(def.ui.text_color.as_deref(), Some("white"));
        assert!(!def.start_editable());
        assert!(def.duration_editable());
        assert_eq!(def.extended_props.get("room"), Some(&Value::from("4B")));
    }

    #[test]
    fn test_recurring_def_has_no_instance() {
        let env = DateEnv::utc();
        let parsed = parse_event(
            input(serde_json::json!({"daysOfWeek": [2, 4], "startTime": "09:00", "endTime": "11:00"})),
            None,
            &env,
            &settings(),
        )
        .unwrap();
        assert!(parsed.instance.is_none());
        assert!(!parsed.def.all_day);
        assert!(parsed.def.has_end);
        let recurring = parsed.def.recurring.unwrap();
        assert_eq!(recurring.duration, Some(Duration::from_millis(2 * MS_PER_HOUR)));
    }

    #[test]
    fn test_overnight_recurrence_ends_next_day() {
        let env = DateEnv::utc();
        let window = DateRange::new(mk("2017-07-03"), mk("2017-07-10")).unwrap();
        let store = parse_events(
            vec![input(serde_json::json!({
                "title": "Night shift",
                "daysOfWeek": [3],
                "startTime": "22:00",
                "endTime": "02:00"
            }))],
            None,
            &env,
            &settings(),
            Some(&window),
        );
        let ranges: Vec<DateRange> = store.instances().values().map(|i| i.range).collect();
        assert_eq!(
            ranges,
            vec![DateRange::new(mk("2017-07-05T22:00"), mk("2017-07-06T02:00")).unwrap()]
        );
    }

    #[test]
    fn test_negative_recurring_duration_uses_default() {
        let env = DateEnv::utc();
        let parsed = parse_event(
            input(serde_json::json!({"daysOfWeek": [1], "startTime": "09:00", "duration": "-01:00"})),
            None,
            &env,
            &settings(),
        )
        .unwrap();
        assert_eq!(parsed.def.recurring.unwrap().duration, None);
        assert!(!parsed.def.has_end);
    }

    #[test]
    fn test_parse_events_skips_bad_input() {
        let env = DateEnv::utc();
        let window = DateRange::new(mk("2017-07-03"), mk("2017-07-10")).unwrap();
        let store = parse_events(
            vec![
                input(serde_json::json!({"title": "ok", "start": "2017-07-05"})),
                input(serde_json::json!({"title": "no start"})),
                input(serde_json::json!({"title": "bad", "start": "2017-13-45"})),
                input(serde_json::json!({"daysOfWeek": [2, 4], "startTime": "09:00", "endTime": "11:00"})),
            ],
            None,
            &env,
            &settings(),
            Some(&window),
        );
        assert_eq!(store.defs().len(), 2);
        assert_eq!(store.instances().len(), 3);
    }

    #[test]
    fn test_source_default_all_day() {
        let env = DateEnv::utc();
        let settings = settings().with_source_default_all_day(Some(true));
        let parsed = parse_event(
            input(serde_json::json!({"start": "2024-01-05T10:00:00"})),
            None,
            &env,
            &settings,
        )
        .unwrap();
        assert!(parsed.def.all_day);
    }
}
