use serde::Serialize;
use serde_json::{Map, Value};

use super::recurrence::RecurrenceRule;
use crate::duration::Duration;

/// Display and editing properties of an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUi {
    pub display: Option<String>,
    pub start_editable: Option<bool>,
    pub duration_editable: Option<bool>,
    pub overlap: Option<bool>,
    pub background_color: Option<String>,
    pub border_color: Option<String>,
    pub text_color: Option<String>,
    pub class_names: Vec<String>,
}

impl EventUi {
    /// Later values win; class names accumulate.
    pub fn merge(&self, other: &EventUi) -> EventUi {
        let mut class_names = self.class_names.clone();
        for name in &other.class_names {
            if !class_names.contains(name) {
                class_names.push(name.clone());
            }
        }
        EventUi {
            display: other.display.clone().or_else(|| self.display.clone()),
            start_editable: other.start_editable.or(self.start_editable),
            duration_editable: other.duration_editable.or(self.duration_editable),
            overlap: other.overlap.or(self.overlap),
            background_color: other
                .background_color
                .clone()
                .or_else(|| self.background_color.clone()),
            border_color: other.border_color.clone().or_else(|| self.border_color.clone()),
            text_color: other.text_color.clone().or_else(|| self.text_color.clone()),
            class_names,
        }
    }
}

/// How a recurring definition repeats.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringDef {
    pub rule: RecurrenceRule,
    /// Length of each occurrence. `None` falls back to the default durations.
    pub duration: Option<Duration>,
}

/// The template for one event or a recurring series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDef {
    pub def_id: String,
    pub source_id: Option<String>,
    /// The id given in the input, if any.
    pub public_id: Option<String>,
    pub group_id: Option<String>,
    pub title: String,
    pub url: Option<String>,
    pub all_day: bool,
    pub has_end: bool,
    pub recurring: Option<RecurringDef>,
    pub ui: EventUi,
    pub extended_props: Map<String, Value>,
}

impl EventDef {
    pub fn is_recurring(&self) -> bool {
        self.recurring.is_some()
    }

    /// Whether the start may move. An unset flag means editable.
    pub fn start_editable(&self) -> bool {
        self.ui.start_editable.unwrap_or(true)
    }

    pub fn duration_editable(&self) -> bool {
        self.ui.duration_editable.unwrap_or(true)
    }
}
