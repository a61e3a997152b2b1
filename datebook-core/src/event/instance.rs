use serde::Serialize;
use uuid::Uuid;

use crate::date_range::DateRange;

/// One dated occurrence of an [`EventDef`](super::EventDef).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInstance {
    pub instance_id: String,
    pub def_id: String,
    pub range: DateRange,
    /// Offsets from the input, kept when the environment could not compute
    /// its own.
    pub forced_start_tzo: Option<i64>,
    pub forced_end_tzo: Option<i64>,
}

impl EventInstance {
    pub fn new(def_id: impl Into<String>, range: DateRange) -> Self {
        EventInstance {
            instance_id: Uuid::new_v4().to_string(),
            def_id: def_id.into(),
            range,
            forced_start_tzo: None,
            forced_end_tzo: None,
        }
    }

    pub fn with_forced_offsets(mut self, start: Option<i64>, end: Option<i64>) -> Self {
        self.forced_start_tzo = start;
        self.forced_end_tzo = end;
        self
    }
}
