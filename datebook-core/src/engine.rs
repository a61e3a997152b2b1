//! One calendar instance: date environment, navigation state, sources and
//! the event store, wired together.
//!
//! Everything but fetching is synchronous. Fetching is split in three so that
//! callers can run it on their own schedule: [`EventEngine::request_fetches`]
//! issues tickets, [`EventEngine::fetch_task`] produces a detached future per
//! ticket, and [`EventEngine::receive`] applies a result if its ticket is
//! still the latest one for the source.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::date_range::DateRange;
use crate::env::{DateEnv, TimeZoneSetting};
use crate::error::{DatebookError, DatebookResult};
use crate::event::{
    EventDef, EventInput, EventInstance, EventMutation, EventStore, ParseSettings, parse_event,
    parse_events, try_apply_mutation,
};
use crate::marker::Marker;
use crate::options::CalendarOptions;
use crate::profile::{NavigationState, ProfileAction, ProfileState, reduce};
use crate::source::{
    EventSource, FetchRequest, FetchTicket, SingleFlight, SourceInput, SourceRegistry,
};
use crate::theme::{Theme, theme_for};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FetchKey {
    source_id: String,
    /// `None` for sources whose result does not depend on the range.
    range: Option<DateRange>,
}

type FetchResult = DatebookResult<Arc<Vec<EventInput>>>;

/// An instance together with its definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEvent {
    pub def: Arc<EventDef>,
    pub instance: Arc<EventInstance>,
}

/// A fetch that failed for a current ticket.
#[derive(Debug)]
pub struct FetchFailure {
    pub source_id: String,
    pub error: DatebookError,
}

#[derive(Debug)]
pub struct EventEngine {
    env: DateEnv,
    options: CalendarOptions,
    sources: SourceRegistry,
    flights: SingleFlight<FetchKey, Arc<Vec<EventInput>>>,
    store: EventStore,
    profile: ProfileState,
}

impl EventEngine {
    pub fn new(options: CalendarOptions) -> DatebookResult<Self> {
        let env = options.date_env()?;
        let now = resolve_now(&env, &options)?;
        let initial = match &options.initial_date {
            Some(input) => env.create_marker(input)?,
            None => now,
        };
        let profile = ProfileState::init(&env, &options, &options.initial_view, initial)?;
        debug!(view = %profile.view_type, time_zone = %env.time_zone(), "Created event engine");
        Ok(EventEngine {
            env,
            options,
            sources: SourceRegistry::new(),
            flights: SingleFlight::new(),
            store: EventStore::new(),
            profile,
        })
    }

    pub fn env(&self) -> &DateEnv {
        &self.env
    }

    pub fn options(&self) -> &CalendarOptions {
        &self.options
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn profile(&self) -> &ProfileState {
        &self.profile
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    /// "Today": the pinned `now` option, or the system clock.
    pub fn now(&self) -> DatebookResult<Marker> {
        resolve_now(&self.env, &self.options)
    }

    pub fn navigation(&self) -> DatebookResult<NavigationState> {
        Ok(self.profile.navigation(self.now()?))
    }

    pub fn theme(&self) -> DatebookResult<&'static Theme> {
        theme_for(&self.options.theme_system)
    }

    // Sources

    pub fn add_source(&mut self, input: &SourceInput) -> DatebookResult<String> {
        Ok(self.add_event_source(EventSource::from_input(input)?))
    }

    /// Register a source built by the caller, e.g. around a custom fetcher.
    pub fn add_event_source(&mut self, source: EventSource) -> String {
        info!(source = %source.source_id, kind = source.fetcher.kind(), "Adding event source");
        self.sources.add(source)
    }

    /// Remove a source and every event it contributed.
    pub async fn remove_source(&mut self, source_id: &str) -> bool {
        if self.sources.remove(source_id).is_none() {
            debug!(source = %source_id, "No such event source");
            return false;
        }
        self.store = self.store.exclude_source(source_id);
        self.flights
            .invalidate_where(|key| key.source_id == source_id)
            .await;
        true
    }

    // Fetching

    /// Tickets for every source that is dirty for the active range.
    pub fn request_fetches(&mut self) -> Vec<FetchTicket> {
        let Some(range) = self.profile.profile.active_range else {
            debug!("Active range is empty, nothing to fetch");
            return Vec::new();
        };
        self.sources
            .dirty_sources(&range, self.options.lazy_fetching)
            .into_iter()
            .filter_map(|id| self.sources.begin_fetch(&id, range))
            .collect()
    }

    /// A future performing the fetch for `ticket`. Concurrent tasks for the
    /// same source and range share one physical fetch.
    pub fn fetch_task(&self, ticket: &FetchTicket) -> impl Future<Output = FetchResult> + Send + 'static {
        let fetcher = self
            .sources
            .get(&ticket.source_id)
            .map(|s| Arc::clone(&s.fetcher));
        let flights = self.flights.clone();
        let request = FetchRequest {
            source_id: ticket.source_id.clone(),
            range: ticket.range,
            env: self.env.clone(),
        };
        async move {
            let Some(fetcher) = fetcher else {
                return Err(DatebookError::Fetch(format!(
                    "Unknown event source '{}'",
                    request.source_id
                )));
            };
            let key = FetchKey {
                source_id: request.source_id.clone(),
                range: (!fetcher.ignores_range()).then_some(request.range),
            };
            flights
                .run(key, false, move || async move {
                    fetcher.fetch(&request).await.map(Arc::new)
                })
                .await
        }
    }

    /// Apply a fetch result. Returns `Ok(false)` when the ticket is stale and
    /// the result was dropped; a failure for a current ticket is returned.
    pub fn receive(&mut self, ticket: &FetchTicket, result: FetchResult) -> DatebookResult<bool> {
        if !self.sources.receive(ticket) {
            return Ok(false);
        }
        let inputs = match result {
            Ok(inputs) => inputs,
            Err(e) => {
                warn!(source = %ticket.source_id, error = %e, "Event source fetch failed");
                return Err(e);
            }
        };
        let settings = self.source_settings(Some(&ticket.source_id));
        let fetched = parse_events(
            inputs.as_ref().clone(),
            Some(&ticket.source_id),
            &self.env,
            &settings,
            Some(&ticket.range),
        );
        debug!(
            source = %ticket.source_id,
            events = fetched.defs().len(),
            "Received events"
        );
        self.store = self.store.exclude_source(&ticket.source_id).merge(&fetched);
        Ok(true)
    }

    /// Fetch every dirty source for the active range and apply the results.
    pub async fn fetch_sources(&mut self) -> Vec<FetchFailure> {
        let tickets = self.request_fetches();
        let tasks: Vec<_> = tickets.iter().map(|t| self.fetch_task(t)).collect();
        let results = join_all(tasks).await;

        let mut failures = Vec::new();
        for (ticket, result) in tickets.iter().zip(results) {
            if let Err(error) = self.receive(ticket, result) {
                failures.push(FetchFailure {
                    source_id: ticket.source_id.clone(),
                    error,
                });
            }
        }
        failures
    }

    /// Drop cached documents and fetch history, then fetch again.
    pub async fn refetch(&mut self) -> Vec<FetchFailure> {
        for source in self.sources.iter() {
            source.fetcher.invalidate().await;
        }
        self.flights.invalidate_where(|_| true).await;
        self.sources.reset_fetch_state();
        self.fetch_sources().await
    }

    // Navigation

    /// Move the view. Recurring events are re-expanded for the new range;
    /// fetching is left to [`fetch_sources`](Self::fetch_sources).
    pub fn navigate(&mut self, action: ProfileAction) -> DatebookResult<()> {
        self.profile = reduce(&self.profile, action, &self.env, &self.options)?;
        if let Some(range) = self.profile.profile.active_range {
            let settings = self.source_settings(None);
            self.store = self.store.expand_recurring(&range, &self.env, &settings);
        }
        Ok(())
    }

    pub fn set_time_zone(&mut self, time_zone: TimeZoneSetting) -> DatebookResult<()> {
        let options = CalendarOptions {
            time_zone,
            ..self.options.clone()
        };
        let env = options.date_env()?;
        let profile =
            ProfileState::init(&env, &options, &self.profile.view_type, self.profile.current_date)?;
        info!(time_zone = %env.time_zone(), "Changed time zone");
        self.store = self.store.rezone(&self.env, &env);
        self.env = env;
        self.options = options;
        self.profile = profile;
        self.sources.reset_fetch_state();
        Ok(())
    }

    // Events

    /// Instances overlapping `range`, ordered by start. Recurring definitions
    /// are expanded over the range first.
    pub fn events_in(&self, range: &DateRange) -> Vec<ResolvedEvent> {
        let settings = self.source_settings(None);
        let expanded = self.store.expand_recurring(range, &self.env, &settings);
        let mut events: Vec<ResolvedEvent> = expanded
            .instances()
            .values()
            .filter(|i| {
                if i.range.is_instant() {
                    range.contains(i.range.start)
                } else {
                    range.intersects(&i.range)
                }
            })
            .filter_map(|instance| {
                let def = expanded.def(&instance.def_id)?;
                Some(ResolvedEvent {
                    def: Arc::clone(def),
                    instance: Arc::clone(instance),
                })
            })
            .collect();
        events.sort_by(|a, b| {
            a.instance
                .range
                .start
                .cmp(&b.instance.range.start)
                .then_with(|| b.def.all_day.cmp(&a.def.all_day))
                .then_with(|| a.def.title.cmp(&b.def.title))
        });
        events
    }

    /// Events in the active range.
    pub fn visible_events(&self) -> Vec<ResolvedEvent> {
        match self.profile.profile.active_range {
            Some(range) => self.events_in(&range),
            None => Vec::new(),
        }
    }

    /// Add one event, optionally on behalf of a source. Returns its def id.
    pub fn add_event(&mut self, input: EventInput, source_id: Option<&str>) -> DatebookResult<String> {
        let settings = self.source_settings(source_id);
        let parsed = parse_event(input, source_id, &self.env, &settings)?;
        let def_id = parsed.def.def_id.clone();
        let recurring = parsed.def.is_recurring();
        self.store = self.store.add(parsed.def, parsed.instance);
        if recurring && let Some(range) = self.profile.profile.active_range {
            self.store = self.store.expand_recurring(&range, &self.env, &settings);
        }
        Ok(def_id)
    }

    /// Remove a definition and its instances. Unknown ids are a no-op.
    pub fn remove_event(&mut self, def_id: &str) -> bool {
        let before = self.store.revision();
        self.store = self.store.remove_def(def_id);
        self.store.revision() != before
    }

    /// Apply a mutation to an instance and its related events. A rejected
    /// mutation leaves the store unchanged.
    pub fn mutate(&mut self, instance_id: &str, mutation: &EventMutation) -> DatebookResult<()> {
        let source_id = self
            .store
            .instance(instance_id)
            .and_then(|i| self.store.def(&i.def_id))
            .and_then(|d| d.source_id.clone());
        let settings = self.source_settings(source_id.as_deref());
        self.store = try_apply_mutation(&self.store, instance_id, mutation, &self.env, &settings)?;
        Ok(())
    }

    fn source_settings(&self, source_id: Option<&str>) -> ParseSettings {
        match source_id.and_then(|id| self.sources.get(id)) {
            Some(source) => source.parse_settings(&self.options),
            None => ParseSettings::from_options(&self.options),
        }
    }
}

fn resolve_now(env: &DateEnv, options: &CalendarOptions) -> DatebookResult<Marker> {
    match &options.now {
        Some(input) => env.create_marker(input),
        None => Ok(env.now_marker()),
    }
}
