//! Raw event input as it arrives from arrays, JSON feeds and the ical adapter.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::duration::Duration;
use crate::env::DateInput;

/// Feeds send ids as strings or numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdInput {
    Text(String),
    Number(i64),
}

impl IdInput {
    pub fn into_string(self) -> String {
        match self {
            IdInput::Text(s) => s,
            IdInput::Number(n) => n.to_string(),
        }
    }
}

/// `"a b"` or `["a", "b"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassNamesInput {
    Text(String),
    List(Vec<String>),
}

impl ClassNamesInput {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            ClassNamesInput::Text(s) => s.split_whitespace().map(str::to_string).collect(),
            ClassNamesInput::List(list) => list,
        }
    }
}

/// Nested recurrence block. The same keys are also accepted at the top level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecurrenceInput {
    pub days_of_week: Option<Vec<u32>>,
    pub start_time: Option<Duration>,
    pub end_time: Option<Duration>,
    pub start_recur: Option<DateInput>,
    pub end_recur: Option<DateInput>,
}

impl RecurrenceInput {
    pub fn is_empty(&self) -> bool {
        self.days_of_week.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.start_recur.is_none()
            && self.end_recur.is_none()
    }

    /// Fill unset keys from `other`.
    fn or(self, other: RecurrenceInput) -> RecurrenceInput {
        RecurrenceInput {
            days_of_week: self.days_of_week.or(other.days_of_week),
            start_time: self.start_time.or(other.start_time),
            end_time: self.end_time.or(other.end_time),
            start_recur: self.start_recur.or(other.start_recur),
            end_recur: self.end_recur.or(other.end_recur),
        }
    }
}

/// An event before parsing. Keys use the camelCase wire names; anything
/// unrecognised ends up in `extended_props`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventInput {
    pub id: Option<IdInput>,
    pub group_id: Option<IdInput>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub start: Option<DateInput>,
    /// Alias for `start`.
    pub date: Option<DateInput>,
    pub end: Option<DateInput>,
    pub all_day: Option<bool>,

    // Recurrence
    pub recurrence: Option<RecurrenceInput>,
    pub days_of_week: Option<Vec<u32>>,
    pub start_time: Option<Duration>,
    pub end_time: Option<Duration>,
    pub start_recur: Option<DateInput>,
    pub end_recur: Option<DateInput>,
    /// Length of each occurrence; overrides `endTime - startTime`.
    pub duration: Option<Duration>,

    // UI
    pub display: Option<String>,
    pub editable: Option<bool>,
    pub start_editable: Option<bool>,
    pub duration_editable: Option<bool>,
    pub overlap: Option<bool>,
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub border_color: Option<String>,
    pub text_color: Option<String>,
    pub class_names: Option<ClassNamesInput>,

    pub extended_props: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventInput {
    /// Top-level and nested recurrence keys merged; nested wins.
    pub fn recurrence_rule(&self) -> RecurrenceInput {
        let top = RecurrenceInput {
            days_of_week: self.days_of_week.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            start_recur: self.start_recur.clone(),
            end_recur: self.end_recur.clone(),
        };
        match &self.recurrence {
            Some(nested) => nested.clone().or(top),
            None => top,
        }
    }

    pub fn start_input(&self) -> Option<&DateInput> {
        self.start.as_ref().or(self.date.as_ref())
    }
}
