//! Applying edits to events.
//!
//! Date changes are deltas added to the existing range, never absolute
//! values, so repeated application composes.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::def::{EventDef, EventUi};
use super::instance::EventInstance;
use super::parse::ParseSettings;
use super::store::EventStore;
use crate::date_range::{DateRange, compute_aligned_day_range};
use crate::duration::Duration;
use crate::env::DateEnv;
use crate::error::{DatebookError, DatebookResult};

/// Changes to the non-date properties of a definition. Unset fields stay.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StandardPropChanges {
    pub title: Option<String>,
    pub url: Option<String>,
    pub group_id: Option<String>,
    pub all_day: Option<bool>,
    pub has_end: Option<bool>,
    pub display: Option<String>,
    pub start_editable: Option<bool>,
    pub duration_editable: Option<bool>,
    pub overlap: Option<bool>,
    pub background_color: Option<String>,
    pub border_color: Option<String>,
    pub text_color: Option<String>,
    pub class_names: Option<Vec<String>>,
}

impl StandardPropChanges {
    fn is_empty(&self) -> bool {
        *self == StandardPropChanges::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventMutation {
    /// Moves start and end together.
    pub dates_delta: Option<Duration>,
    pub start_delta: Option<Duration>,
    pub end_delta: Option<Duration>,
    pub standard_prop_changes: Option<StandardPropChanges>,
    pub extended_prop_changes: Option<Map<String, Value>>,
}

impl EventMutation {
    pub fn move_dates(delta: Duration) -> Self {
        EventMutation {
            dates_delta: Some(delta),
            ..Default::default()
        }
    }

    /// Switch between all-day and timed. With `maintain_duration` the current
    /// length survives; otherwise the default duration for the new kind is used.
    pub fn set_all_day(all_day: bool, maintain_duration: bool) -> Self {
        EventMutation {
            standard_prop_changes: Some(StandardPropChanges {
                all_day: Some(all_day),
                has_end: Some(maintain_duration),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn delta(d: Option<Duration>) -> Option<Duration> {
        d.filter(|d| !d.is_zero())
    }
}

/// Apply `mutation` to the instance and everything related to it (its
/// definition and the definitions sharing its group). Unknown instance ids
/// are rejected.
pub fn try_apply_mutation(
    store: &EventStore,
    instance_id: &str,
    mutation: &EventMutation,
    env: &DateEnv,
    settings: &ParseSettings,
) -> DatebookResult<EventStore> {
    let relevant = store.relevant_events(instance_id);
    if relevant.instances().is_empty() {
        return Err(DatebookError::MutationRejected(format!(
            "No event instance '{instance_id}'"
        )));
    }

    let mut defs = Vec::new();
    for def in relevant.defs().values() {
        defs.push(mutate_def(def, mutation, settings));
    }
    let mut instances = Vec::new();
    for instance in relevant.instances().values() {
        let Some(def) = defs.iter().find(|d| d.def_id == instance.def_id) else {
            continue;
        };
        let Some(original_def) = relevant.def(&instance.def_id) else {
            continue;
        };
        instances.push(mutate_instance(
            instance,
            original_def,
            def,
            mutation,
            env,
            settings,
        ));
    }
    Ok(store.replace_entries(defs, instances))
}

/// Like [`try_apply_mutation`], but a rejected mutation hands back the store
/// unchanged.
pub fn apply_mutation(
    store: &EventStore,
    instance_id: &str,
    mutation: &EventMutation,
    env: &DateEnv,
    settings: &ParseSettings,
) -> EventStore {
    match try_apply_mutation(store, instance_id, mutation, env, settings) {
        Ok(next) => next,
        Err(e) => {
            debug!("{e}");
            store.clone()
        }
    }
}

fn mutate_def(def: &Arc<EventDef>, mutation: &EventMutation, settings: &ParseSettings) -> Arc<EventDef> {
    let changes = mutation
        .standard_prop_changes
        .as_ref()
        .filter(|c| !c.is_empty());
    let extended = mutation
        .extended_prop_changes
        .as_ref()
        .filter(|m| !m.is_empty());
    let resizes = EventMutation::delta(mutation.start_delta).is_some()
        || EventMutation::delta(mutation.end_delta).is_some();

    let mut next = (**def).clone();
    if let Some(changes) = changes {
        if let Some(title) = &changes.title {
            next.title = title.clone();
        }
        if let Some(url) = &changes.url {
            next.url = Some(url.clone());
        }
        if let Some(group_id) = &changes.group_id {
            next.group_id = Some(group_id.clone());
        }
        if let Some(all_day) = changes.all_day {
            next.all_day = all_day;
        }
        if let Some(has_end) = changes.has_end {
            next.has_end = has_end;
        }
        next.ui = next.ui.merge(&EventUi {
            display: changes.display.clone(),
            start_editable: changes.start_editable,
            duration_editable: changes.duration_editable,
            overlap: changes.overlap,
            background_color: changes.background_color.clone(),
            border_color: changes.border_color.clone(),
            text_color: changes.text_color.clone(),
            class_names: Vec::new(),
        });
        if let Some(class_names) = &changes.class_names {
            next.ui.class_names = class_names.clone();
        }
    }
    if changes.and_then(|c| c.has_end).is_none() && resizes && def.duration_editable() {
        next.has_end = true;
    }
    if let Some(extended) = extended {
        for (key, value) in extended {
            next.extended_props.insert(key.clone(), value.clone());
        }
    }
    if !next.has_end && settings.force_event_duration {
        next.has_end = true;
    }

    if next == **def {
        Arc::clone(def)
    } else {
        Arc::new(next)
    }
}

fn mutate_instance(
    instance: &Arc<EventInstance>,
    original_def: &EventDef,
    def: &EventDef,
    mutation: &EventMutation,
    env: &DateEnv,
    settings: &ParseSettings,
) -> Arc<EventInstance> {
    let changes = mutation.standard_prop_changes.as_ref();
    let force_all_day = changes.and_then(|c| c.all_day) == Some(true);
    let clear_end = changes.and_then(|c| c.has_end) == Some(false);

    let mut range = instance.range;
    if force_all_day {
        range = compute_aligned_day_range(&range);
    }
    if let Some(delta) = EventMutation::delta(mutation.dates_delta)
        && original_def.start_editable()
    {
        range = DateRange {
            start: env.add(range.start, &delta),
            end: env.add(range.end, &delta),
        };
    }
    if let Some(delta) = EventMutation::delta(mutation.start_delta)
        && original_def.duration_editable()
    {
        range.start = env.add(range.start, &delta);
    }
    if let Some(delta) = EventMutation::delta(mutation.end_delta)
        && original_def.duration_editable()
    {
        range.end = env.add(range.end, &delta);
    }
    if clear_end {
        range.end = settings.default_end(env, def.all_day, range.start);
    }
    if def.all_day {
        range = DateRange {
            start: range.start.start_of_day(),
            end: range.end.start_of_day(),
        };
    }
    if range.end < range.start {
        range.end = settings.default_end(env, def.all_day, range.start);
    }

    if range == instance.range {
        Arc::clone(instance)
    } else {
        Arc::new(EventInstance {
            range,
            ..(**instance).clone()
        })
    }
}
