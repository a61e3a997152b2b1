pub mod config;
pub mod events;
pub mod format;
pub mod profile;

use anyhow::Result;
use clap::ValueEnum;
use datebook_core::env::DateInput;
use datebook_core::profile::ProfileAction;
use datebook_core::{CalendarOptions, EventEngine};

/// One navigation step applied after the view is set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Step {
    Prev,
    Next,
    Today,
}

/// Build an engine for `view` anchored at `date`, then walk `steps`.
pub fn build_engine(
    mut options: CalendarOptions,
    view: Option<&str>,
    date: Option<&str>,
    steps: &[Step],
) -> Result<EventEngine> {
    if let Some(view) = view {
        options.initial_view = view.to_string();
    }
    if let Some(date) = date {
        options.initial_date = Some(DateInput::from(date));
    }
    let mut engine = EventEngine::new(options)?;
    for step in steps {
        let action = match step {
            Step::Prev => ProfileAction::Prev,
            Step::Next => ProfileAction::Next,
            Step::Today => ProfileAction::Today(engine.now()?),
        };
        engine.navigate(action)?;
    }
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use datebook_core::env::TimeZoneSetting;

    #[test]
    fn test_steps_move_the_view() {
        let options = CalendarOptions {
            time_zone: TimeZoneSetting::Utc,
            now: Some(DateInput::from("2024-03-10")),
            ..Default::default()
        };
        let engine = build_engine(
            options,
            Some("timeGridWeek"),
            Some("2024-01-17"),
            &[Step::Next, Step::Next, Step::Prev],
        )
        .unwrap();
        let start = engine.env().format_iso_date(engine.profile().profile.current_range.start);
        assert_eq!(start, "2024-01-21");

        let engine = build_engine(
            CalendarOptions {
                time_zone: TimeZoneSetting::Utc,
                now: Some(DateInput::from("2024-03-10")),
                ..Default::default()
            },
            None,
            Some("2024-01-17"),
            &[Step::Today],
        )
        .unwrap();
        let start = engine.env().format_iso_date(engine.profile().profile.current_range.start);
        assert_eq!(start, "2024-03-01");
    }
}
