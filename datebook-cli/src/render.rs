//! Colored terminal rendering for datebook types.

use datebook_core::profile::NavigationState;
use datebook_core::{DateEnv, DateRange, FetchFailure, ResolvedEvent};
use owo_colors::OwoColorize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for ResolvedEvent {
    fn render(&self) -> String {
        let range = &self.instance.range;
        let time = if self.def.all_day {
            format!("{:>13}", "all-day")
        } else if self.def.has_end {
            format!(
                "{:>13}",
                format!(
                    "{}–{}",
                    range.start.to_naive().format("%H:%M"),
                    range.end.to_naive().format("%H:%M")
                )
            )
        } else {
            format!("{:>13}", range.start.to_naive().format("%H:%M").to_string())
        };
        let title = if self.def.title.is_empty() {
            "(No title)".to_string()
        } else {
            self.def.title.clone()
        };
        match &self.def.source_id {
            Some(source) => format!("{} {} {}", time, title, format!("[{}]", source).dimmed()),
            None => format!("{} {}", time, title),
        }
    }
}

impl Render for NavigationState {
    fn render(&self) -> String {
        let flag = |label: &str, enabled: bool| {
            if enabled {
                label.green().to_string()
            } else {
                label.dimmed().strikethrough().to_string()
            }
        };
        format!(
            "{} {} {}",
            flag("prev", self.prev_enabled),
            flag("today", self.today_enabled),
            flag("next", self.next_enabled)
        )
    }
}

impl Render for FetchFailure {
    fn render(&self) -> String {
        format!(
            "{} {} {}",
            "!".red(),
            format!("[{}]", self.source_id).yellow(),
            self.error
        )
    }
}

/// A range as ISO dates, the end shown inclusively for whole days.
pub fn render_range(env: &DateEnv, range: &DateRange) -> String {
    let whole_days = range.start.time_as_ms() == 0 && range.end.time_as_ms() == 0;
    if whole_days && !range.is_instant() {
        format!(
            "{} – {}",
            env.format_iso_date(range.start),
            env.format_iso_date(range.end.add_days(-1))
        )
    } else {
        format!(
            "{} – {}",
            env.format_iso(range.start, Default::default()),
            env.format_iso(range.end, Default::default())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datebook_core::env::DateInput;

    #[test]
    fn test_whole_day_range_is_inclusive() {
        let env = DateEnv::utc();
        let m = |s: &str| env.create_marker(&DateInput::from(s)).unwrap();
        let range = DateRange::new(m("2024-06-01"), m("2024-07-01")).unwrap();
        assert_eq!(render_range(&env, &range), "2024-06-01 – 2024-06-30");

        let timed = DateRange::new(m("2024-06-01T08:00:00"), m("2024-06-01T09:30:00")).unwrap();
        assert_eq!(
            render_range(&env, &timed),
            "2024-06-01T08:00:00Z – 2024-06-01T09:30:00Z"
        );
    }
}
