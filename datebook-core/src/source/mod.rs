//! Event sources: where raw event input comes from.
//!
//! A source is a [`SourceFetcher`] plus the parsing defaults that apply to its
//! events. Fetching goes through [`SingleFlight`] so concurrent requests for
//! the same source and range share one physical fetch.

mod array;
mod fetch;
mod ical;
mod json_feed;
mod registry;

pub use array::{ArrayFetcher, JsonFileFetcher};
pub use fetch::{FETCH_TIMEOUT, FetchState, FetchStatus, SingleFlight};
pub use ical::{IcalFeedFetcher, expand_ical_document};
pub use json_feed::JsonFeedFetcher;
pub use registry::{EventSource, FetchTicket, SourceRegistry};

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::date_range::DateRange;
use crate::env::DateEnv;
use crate::error::DatebookResult;
use crate::event::{ClassNamesInput, EventInput, EventUi};

/// Everything a fetcher gets to know about one request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub source_id: String,
    pub range: DateRange,
    pub env: DateEnv,
}

/// Turns a request into raw event input.
#[async_trait]
pub trait SourceFetcher: Send + Sync + fmt::Debug {
    fn kind(&self) -> &'static str;

    /// Sources whose result does not depend on the range are fetched once.
    fn ignores_range(&self) -> bool {
        false
    }

    async fn fetch(&self, request: &FetchRequest) -> DatebookResult<Vec<EventInput>>;

    /// Drop anything cached so the next fetch goes back to the origin.
    async fn invalidate(&self) {}
}

/// Decode a JSON array of events, skipping entries that are not valid event
/// input. Only a body that is not an array at all is an error.
pub(crate) fn decode_event_array(
    body: &str,
    origin: &str,
) -> Result<Vec<EventInput>, serde_json::Error> {
    let items: Vec<Value> = serde_json::from_str(body)?;
    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<EventInput>(item) {
            Ok(input) => Some(input),
            Err(e) => {
                warn!(origin, index, "Skipping invalid event input: {e}");
                None
            }
        })
        .collect())
}

/// Which fetcher a configured source uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceKindInput {
    /// Events given inline.
    Array { events: Vec<EventInput> },
    /// A JSON array of events on disk.
    File { path: PathBuf },
    /// A JSON feed queried with the visible range.
    Json {
        url: String,
        #[serde(default)]
        start_param: Option<String>,
        #[serde(default)]
        end_param: Option<String>,
        #[serde(default)]
        time_zone_param: Option<String>,
        #[serde(default)]
        extra_params: BTreeMap<String, String>,
    },
    /// An iCalendar feed: http(s), webcal or a local path.
    Ical { url: String },
}

/// A configured event source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub kind: SourceKindInput,
    #[serde(default)]
    pub default_all_day: Option<bool>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub border_color: Option<String>,
    #[serde(default)]
    pub text_color: Option<String>,
    #[serde(default)]
    pub class_names: Option<ClassNamesInput>,
    #[serde(default)]
    pub editable: Option<bool>,
    #[serde(default)]
    pub display: Option<String>,
}

impl SourceInput {
    pub fn new(kind: SourceKindInput) -> Self {
        SourceInput {
            id: None,
            kind,
            default_all_day: None,
            color: None,
            background_color: None,
            border_color: None,
            text_color: None,
            class_names: None,
            editable: None,
            display: None,
        }
    }

    /// UI defaults applied to every event of the source.
    pub fn ui(&self) -> EventUi {
        EventUi {
            display: self.display.clone(),
            start_editable: self.editable,
            duration_editable: self.editable,
            overlap: None,
            background_color: self.background_color.clone().or_else(|| self.color.clone()),
            border_color: self.border_color.clone().or_else(|| self.color.clone()),
            text_color: self.text_color.clone(),
            class_names: self
                .class_names
                .clone()
                .map(ClassNamesInput::into_vec)
                .unwrap_or_default(),
        }
    }

    pub fn build_fetcher(&self) -> DatebookResult<Arc<dyn SourceFetcher>> {
        Ok(match &self.kind {
            SourceKindInput::Array { events } => Arc::new(ArrayFetcher::new(events.clone())),
            SourceKindInput::File { path } => Arc::new(JsonFileFetcher::new(path.clone())),
            SourceKindInput::Json {
                url,
                start_param,
                end_param,
                time_zone_param,
                extra_params,
            } => {
                let mut feed = JsonFeedFetcher::new(url)?;
                if let Some(p) = start_param {
                    feed.start_param = p.clone();
                }
                if let Some(p) = end_param {
                    feed.end_param = p.clone();
                }
                if let Some(p) = time_zone_param {
                    feed.time_zone_param = p.clone();
                }
                feed.extra_params = extra_params.clone();
                Arc::new(feed)
            }
            SourceKindInput::Ical { url } => Arc::new(IcalFeedFetcher::new(url)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_input_from_toml() {
        let input: SourceInput = toml::from_str(
            r##"
            id = "holidays"
            kind = "ical"
            url = "webcal://example.com/holidays.ics"
            color = "#378006"
            "##,
        )
        .unwrap();
        assert_eq!(input.id.as_deref(), Some("holidays"));
        assert!(matches!(input.kind, SourceKindInput::Ical { .. }));
        let ui = input.ui();
        assert_eq!(ui.background_color.as_deref(), Some("#378006"));
        assert_eq!(ui.border_color.as_deref(), Some("#378006"));

        let fetcher = input.build_fetcher().unwrap();
        assert_eq!(fetcher.kind(), "ical");
    }

    #[test]
    fn test_json_source_params() {
        let input: SourceInput = serde_json::from_value(serde_json::json!({
            "kind": "json",
            "url": "https://example.com/feed",
            "start_param": "from",
            "extra_params": {"team": "ops"}
        }))
        .unwrap();
        match &input.kind {
            SourceKindInput::Json {
                start_param,
                extra_params,
                ..
            } => {
                assert_eq!(start_param.as_deref(), Some("from"));
                assert_eq!(extra_params.get("team").map(String::as_str), Some("ops"));
            }
            other => panic!("Expected json source, got {:?}", other),
        }
        assert_eq!(input.build_fetcher().unwrap().kind(), "json");
    }
}
