use anyhow::Result;
use datebook_core::env::DateInput;
use datebook_core::{DateRange, EventEngine};
use owo_colors::OwoColorize;
use serde_json::json;

use crate::render::Render;

pub async fn run(
    engine: &mut EventEngine,
    from: Option<&str>,
    to: Option<&str>,
    as_json: bool,
) -> Result<()> {
    for failure in engine.fetch_sources().await {
        eprintln!("{}", failure.render());
    }

    let Some(range) = resolve_range(engine, from, to)? else {
        println!("{}", "Nothing to show: the view lies outside the valid range".dimmed());
        return Ok(());
    };
    let events = engine.events_in(&range);

    if as_json {
        let env = engine.env();
        let out: Vec<_> = events
            .iter()
            .map(|e| {
                json!({
                    "id": e.def.public_id,
                    "title": e.def.title,
                    "source": e.def.source_id,
                    "allDay": e.def.all_day,
                    "start": env.format_iso(e.instance.range.start, Default::default()),
                    "end": e.def.has_end.then(|| env.format_iso(e.instance.range.end, Default::default())),
                    "extendedProps": e.def.extended_props,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("{}", "No events found".dimmed());
        return Ok(());
    }

    let today = engine.now()?.start_of_day();
    let mut current_day = None;
    for event in &events {
        let day = event.instance.range.start.start_of_day();
        if current_day != Some(day) {
            if current_day.is_some() {
                println!();
            }
            println!("{}", day_label(day, today).bold());
            current_day = Some(day);
        }
        println!("  {}", event.render());
    }

    Ok(())
}

/// `--from`/`--to` when given, filling a missing end from the active range.
fn resolve_range(
    engine: &EventEngine,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Option<DateRange>> {
    let active = engine.profile().profile.active_range;
    let env = engine.env();
    let start = match from {
        Some(s) => Some(env.create_marker(&DateInput::from(s))?),
        None => active.map(|r| r.start),
    };
    let end = match to {
        Some(s) => Some(env.create_marker(&DateInput::from(s))?),
        None => active.map(|r| r.end),
    };
    match (start, end) {
        (Some(start), Some(end)) => Ok(Some(DateRange::new(start, end)?)),
        _ => Ok(None),
    }
}

/// "Today", "Tomorrow", or e.g. "Wed Feb 25".
fn day_label(day: datebook_core::Marker, today: datebook_core::Marker) -> String {
    match today.diff_whole_days(day) {
        Some(0) => "Today".to_string(),
        Some(1) => "Tomorrow".to_string(),
        _ => day.to_naive().format("%a %b %-d").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datebook_core::CalendarOptions;
    use datebook_core::env::TimeZoneSetting;

    fn engine() -> EventEngine {
        EventEngine::new(CalendarOptions {
            time_zone: TimeZoneSetting::Utc,
            initial_date: Some(DateInput::from("2024-06-12")),
            now: Some(DateInput::from("2024-06-12T08:00:00")),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_range_defaults_to_active_range() {
        let engine = engine();
        let range = resolve_range(&engine, None, None).unwrap().unwrap();
        assert_eq!(engine.env().format_iso_date(range.start), "2024-05-26");

        let range = resolve_range(&engine, Some("2024-06-20"), None).unwrap().unwrap();
        assert_eq!(engine.env().format_iso_date(range.start), "2024-06-20");
        assert!(resolve_range(&engine, Some("2024-08-01"), Some("2024-07-01")).is_err());
    }

    #[test]
    fn test_day_labels() {
        let engine = engine();
        let today = engine.now().unwrap().start_of_day();
        assert_eq!(day_label(today, today), "Today");
        assert_eq!(day_label(today.add_days(1), today), "Tomorrow");
        assert_eq!(day_label(today.add_days(2), today), "Fri Jun 14");
    }

    #[tokio::test]
    async fn test_lists_file_source_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        std::fs::write(
            &path,
            r#"[{"title": "Standup", "start": "2024-06-13T09:00:00"}]"#,
        )
        .unwrap();

        let mut engine = engine();
        engine
            .add_source(&datebook_core::source::SourceInput::new(
                datebook_core::source::SourceKindInput::File { path },
            ))
            .unwrap();
        run(&mut engine, None, None, true).await.unwrap();

        let events = engine.visible_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].def.title, "Standup");
    }
}
