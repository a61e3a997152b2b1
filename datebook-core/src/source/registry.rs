use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{SourceFetcher, SourceInput};
use crate::date_range::DateRange;
use crate::error::DatebookResult;
use crate::event::{EventUi, ParseSettings};
use crate::options::CalendarOptions;

/// A registered source and where it is in its fetch cycle.
#[derive(Debug, Clone)]
pub struct EventSource {
    pub source_id: String,
    pub fetcher: Arc<dyn SourceFetcher>,
    pub default_all_day: Option<bool>,
    pub ui: EventUi,

    // Fetch cycle
    pub latest_fetch_id: Option<u64>,
    pub fetch_range: Option<DateRange>,
    pub is_fetching: bool,
}

impl EventSource {
    pub fn new(source_id: impl Into<String>, fetcher: Arc<dyn SourceFetcher>) -> Self {
        EventSource {
            source_id: source_id.into(),
            fetcher,
            default_all_day: None,
            ui: EventUi::default(),
            latest_fetch_id: None,
            fetch_range: None,
            is_fetching: false,
        }
    }

    pub fn from_input(input: &SourceInput) -> DatebookResult<Self> {
        let source_id = input
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Ok(EventSource {
            default_all_day: input.default_all_day,
            ui: input.ui(),
            ..EventSource::new(source_id, input.build_fetcher()?)
        })
    }

    pub fn ignores_range(&self) -> bool {
        self.fetcher.ignores_range()
    }

    /// Parsing defaults for this source's events.
    pub fn parse_settings(&self, options: &CalendarOptions) -> ParseSettings {
        ParseSettings::from_options(options)
            .with_source_default_all_day(self.default_all_day)
            .with_source_ui(self.ui.clone())
    }

    /// Whether the source has to be fetched to cover `range`.
    pub fn is_dirty(&self, range: &DateRange, lazy_fetching: bool) -> bool {
        if self.ignores_range() {
            return self.latest_fetch_id.is_none();
        }
        match &self.fetch_range {
            None => true,
            Some(fetched) => {
                !lazy_fetching
                    || self.is_fetching
                    || range.start < fetched.start
                    || range.end > fetched.end
            }
        }
    }
}

/// Identifies one issued fetch. Results are only applied for the latest ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub source_id: String,
    pub fetch_id: u64,
    pub range: DateRange,
}

#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: BTreeMap<String, EventSource>,
    next_fetch_id: u64,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source, replacing any with the same id. Returns the id.
    pub fn add(&mut self, source: EventSource) -> String {
        let id = source.source_id.clone();
        if self.sources.insert(id.clone(), source).is_some() {
            debug!(source = %id, "Replaced event source");
        }
        id
    }

    pub fn remove(&mut self, source_id: &str) -> Option<EventSource> {
        self.sources.remove(source_id)
    }

    pub fn get(&self, source_id: &str) -> Option<&EventSource> {
        self.sources.get(source_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventSource> {
        self.sources.values()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn is_source_dirty(&self, source_id: &str, range: &DateRange, lazy_fetching: bool) -> bool {
        self.sources
            .get(source_id)
            .is_some_and(|s| s.is_dirty(range, lazy_fetching))
    }

    /// Ids of every source that has to be fetched for `range`.
    pub fn dirty_sources(&self, range: &DateRange, lazy_fetching: bool) -> Vec<String> {
        self.sources
            .values()
            .filter(|s| s.is_dirty(range, lazy_fetching))
            .map(|s| s.source_id.clone())
            .collect()
    }

    /// Issue a new fetch id for the source and mark it fetching.
    pub fn begin_fetch(&mut self, source_id: &str, range: DateRange) -> Option<FetchTicket> {
        let source = self.sources.get_mut(source_id)?;
        self.next_fetch_id += 1;
        source.latest_fetch_id = Some(self.next_fetch_id);
        source.fetch_range = Some(range);
        source.is_fetching = true;
        Some(FetchTicket {
            source_id: source_id.to_string(),
            fetch_id: self.next_fetch_id,
            range,
        })
    }

    /// Settle a fetch. Returns false for a ticket that is no longer the
    /// source's latest, or whose source is gone; its result must be dropped.
    pub fn receive(&mut self, ticket: &FetchTicket) -> bool {
        let Some(source) = self.sources.get_mut(&ticket.source_id) else {
            warn!(source = %ticket.source_id, "Dropping result for removed source");
            return false;
        };
        if source.latest_fetch_id != Some(ticket.fetch_id) {
            warn!(
                source = %ticket.source_id,
                fetch_id = ticket.fetch_id,
                latest = ?source.latest_fetch_id,
                "Dropping stale fetch result"
            );
            return false;
        }
        source.is_fetching = false;
        true
    }

    /// Forget fetch history so every source counts as dirty again.
    pub fn reset_fetch_state(&mut self) {
        for source in self.sources.values_mut() {
            source.fetch_range = None;
            source.latest_fetch_id = None;
        }
    }
}
