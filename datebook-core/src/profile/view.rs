//! Named view specifications.

use serde::Serialize;

use crate::duration::{Duration, TimeUnit};
use crate::error::{DatebookError, DatebookResult};

/// How a view lays out its days. Only affects range computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewKind {
    /// Rows of whole weeks; month and year ranges snap to week boundaries.
    DayGrid,
    /// Day columns with time slots; honours slot min/max time.
    TimeGrid,
    List,
    MultiMonth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewSpec {
    pub type_name: String,
    pub kind: ViewKind,
    /// `None` for generic views sized by day count or visible range.
    pub duration: Option<Duration>,
    /// Pads month grids to six rows when fixed week count is on.
    pub month_mode: bool,
}

impl ViewSpec {
    pub fn duration_unit(&self) -> Option<TimeUnit> {
        self.duration.map(|d| d.greatest_denominator().0)
    }

    pub fn uses_min_max_time(&self) -> bool {
        self.kind == ViewKind::TimeGrid
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self.month_mode = false;
        self
    }
}

/// Look up a view by type name.
pub fn view_spec_for(type_name: &str) -> DatebookResult<ViewSpec> {
    let (kind, duration, month_mode) = match type_name {
        "dayGridMonth" => (ViewKind::DayGrid, Some(Duration::from_months(1)), true),
        "dayGridWeek" => (ViewKind::DayGrid, Some(Duration::from_weeks(1)), false),
        "dayGridDay" => (ViewKind::DayGrid, Some(Duration::from_days(1)), false),
        "dayGridYear" => (ViewKind::DayGrid, Some(Duration::from_years(1)), false),
        "dayGrid" => (ViewKind::DayGrid, None, false),
        "timeGridWeek" => (ViewKind::TimeGrid, Some(Duration::from_weeks(1)), false),
        "timeGridDay" => (ViewKind::TimeGrid, Some(Duration::from_days(1)), false),
        "timeGrid" => (ViewKind::TimeGrid, None, false),
        "listDay" => (ViewKind::List, Some(Duration::from_days(1)), false),
        "listWeek" => (ViewKind::List, Some(Duration::from_weeks(1)), false),
        "listMonth" => (ViewKind::List, Some(Duration::from_months(1)), false),
        "listYear" => (ViewKind::List, Some(Duration::from_years(1)), false),
        "list" => (ViewKind::List, None, false),
        "multiMonthYear" => (ViewKind::MultiMonth, Some(Duration::from_years(1)), false),
        other => {
            return Err(DatebookError::Config(format!("Unknown view type '{other}'")));
        }
    };
    Ok(ViewSpec {
        type_name: type_name.to_string(),
        kind,
        duration,
        month_mode,
    })
}
