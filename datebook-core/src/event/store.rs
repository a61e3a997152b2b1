//! The event store: definitions plus their dated instances.
//!
//! A store is a value. Every operation returns a new store that shares the
//! untouched entries with its input, so callers can detect change with
//! [`EventStore::revision`] or [`Arc::ptr_eq`] on individual entries.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use super::def::EventDef;
use super::instance::EventInstance;
use super::parse::ParseSettings;
use crate::date_range::DateRange;
use crate::env::{DateEnv, DateInput};

#[derive(Debug, Clone, Default)]
pub struct EventStore {
    defs: BTreeMap<String, Arc<EventDef>>,
    instances: BTreeMap<String, Arc<EventInstance>>,
    revision: u64,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Bumped by every operation that changes the contents.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn defs(&self) -> &BTreeMap<String, Arc<EventDef>> {
        &self.defs
    }

    pub fn instances(&self) -> &BTreeMap<String, Arc<EventInstance>> {
        &self.instances
    }

    pub fn def(&self, def_id: &str) -> Option<&Arc<EventDef>> {
        self.defs.get(def_id)
    }

    pub fn instance(&self, instance_id: &str) -> Option<&Arc<EventInstance>> {
        self.instances.get(instance_id)
    }

    pub fn instances_of<'a>(&'a self, def_id: &'a str) -> impl Iterator<Item = &'a Arc<EventInstance>> {
        self.instances.values().filter(move |i| i.def_id == def_id)
    }

    /// Look a definition up by the id it was given in its input.
    pub fn find_by_public_id(&self, public_id: &str) -> Option<&Arc<EventDef>> {
        self.defs
            .values()
            .find(|d| d.public_id.as_deref() == Some(public_id))
    }

    fn changed(mut self, from: &EventStore) -> Self {
        self.revision = from.revision + 1;
        self
    }

    /// Store with one more definition and its instance.
    pub fn add(&self, def: EventDef, instance: Option<EventInstance>) -> EventStore {
        let mut next = self.clone();
        if let Some(instance) = instance {
            debug_assert_eq!(instance.def_id, def.def_id);
            next.instances
                .insert(instance.instance_id.clone(), Arc::new(instance));
        }
        next.defs.insert(def.def_id.clone(), Arc::new(def));
        next.changed(self)
    }

    /// Union of both stores; entries of `other` replace same-id entries.
    pub fn merge(&self, other: &EventStore) -> EventStore {
        if other.is_empty() && other.instances.is_empty() {
            return self.clone();
        }
        let mut next = self.clone();
        for (id, def) in &other.defs {
            next.defs.insert(id.clone(), Arc::clone(def));
        }
        for (id, instance) in &other.instances {
            next.instances.insert(id.clone(), Arc::clone(instance));
        }
        next.check_integrity();
        next.changed(self)
    }

    /// Keep only the definitions matching `keep`, with their instances.
    pub fn filter_defs(&self, keep: impl Fn(&EventDef) -> bool) -> EventStore {
        let defs: BTreeMap<_, _> = self
            .defs
            .iter()
            .filter(|(_, d)| keep(d))
            .map(|(id, d)| (id.clone(), Arc::clone(d)))
            .collect();
        if defs.len() == self.defs.len() {
            return self.clone();
        }
        let instances = self
            .instances
            .iter()
            .filter(|(_, i)| defs.contains_key(&i.def_id))
            .map(|(id, i)| (id.clone(), Arc::clone(i)))
            .collect();
        EventStore {
            defs,
            instances,
            revision: self.revision,
        }
        .changed(self)
    }

    /// Remove every definition and instance that is in `sub`.
    pub fn exclude_sub_store(&self, sub: &EventStore) -> EventStore {
        if sub.defs.is_empty() && sub.instances.is_empty() {
            return self.clone();
        }
        let mut next = self.clone();
        next.defs.retain(|id, _| !sub.defs.contains_key(id));
        next.instances
            .retain(|id, i| !sub.instances.contains_key(id) && !sub.defs.contains_key(&i.def_id));
        next.changed(self)
    }

    /// Drop everything that came from `source_id`.
    pub fn exclude_source(&self, source_id: &str) -> EventStore {
        self.filter_defs(|d| d.source_id.as_deref() != Some(source_id))
    }

    /// Remove a definition and, in the same step, all of its instances.
    /// Unknown ids leave the store as it was.
    pub fn remove_def(&self, def_id: &str) -> EventStore {
        if !self.defs.contains_key(def_id) {
            debug!(def_id, "Remove of unknown event definition ignored");
            return self.clone();
        }
        self.filter_defs(|d| d.def_id != def_id)
    }

    /// The sub-store an edit to `instance_id` affects: its definition plus every
    /// definition sharing its group id, with all their instances.
    pub fn relevant_events(&self, instance_id: &str) -> EventStore {
        let Some(instance) = self.instances.get(instance_id) else {
            return EventStore::new();
        };
        let Some(def) = self.defs.get(&instance.def_id) else {
            return EventStore::new();
        };
        let group_id = def.group_id.as_deref();
        let defs: BTreeMap<_, _> = self
            .defs
            .iter()
            .filter(|(id, d)| {
                *id == &def.def_id || (group_id.is_some() && d.group_id.as_deref() == group_id)
            })
            .map(|(id, d)| (id.clone(), Arc::clone(d)))
            .collect();
        let instances = self
            .instances
            .iter()
            .filter(|(_, i)| defs.contains_key(&i.def_id))
            .map(|(id, i)| (id.clone(), Arc::clone(i)))
            .collect();
        EventStore {
            defs,
            instances,
            revision: 0,
        }
    }

    /// Regenerate the instances of recurring definitions for `window`.
    /// Single events are left alone.
    pub fn expand_recurring(
        &self,
        window: &DateRange,
        env: &DateEnv,
        settings: &ParseSettings,
    ) -> EventStore {
        let mut next = self.clone();
        next.instances.retain(|_, i| {
            self.defs
                .get(&i.def_id)
                .is_none_or(|d| !d.is_recurring())
        });
        let mut generated = 0usize;
        for def in self.defs.values() {
            let Some(recurring) = &def.recurring else {
                continue;
            };
            let duration = recurring
                .duration
                .unwrap_or_else(|| settings.default_duration(def.all_day));
            for range in recurring.rule.expand(window, duration, def.all_day, env) {
                let instance = EventInstance::new(def.def_id.clone(), range);
                next.instances
                    .insert(instance.instance_id.clone(), Arc::new(instance));
                generated += 1;
            }
        }
        trace!(generated, "Expanded recurring events");
        next.changed(self)
    }

    /// Re-read timed instances after the time zone changed: each keeps its
    /// real instant and gets the wall-clock marker of the new zone.
    pub fn rezone(&self, old_env: &DateEnv, new_env: &DateEnv) -> EventStore {
        let mut next = self.clone();
        for (id, instance) in &self.instances {
            let all_day = self
                .defs
                .get(&instance.def_id)
                .is_some_and(|d| d.all_day);
            if all_day {
                continue;
            }
            let convert = |m, tzo| {
                let instant = old_env.to_date(m, tzo);
                new_env.create_marker(&DateInput::from(instant))
            };
            let (Ok(start), Ok(end)) = (
                convert(instance.range.start, instance.forced_start_tzo),
                convert(instance.range.end, instance.forced_end_tzo),
            ) else {
                continue;
            };
            let keep_forced = !new_env.can_compute_offset();
            let rezoned = EventInstance {
                range: DateRange { start, end },
                forced_start_tzo: instance.forced_start_tzo.filter(|_| keep_forced),
                forced_end_tzo: instance.forced_end_tzo.filter(|_| keep_forced),
                ..(**instance).clone()
            };
            next.instances.insert(id.clone(), Arc::new(rezoned));
        }
        next.changed(self)
    }

    pub(crate) fn replace_entries(
        &self,
        defs: Vec<Arc<EventDef>>,
        instances: Vec<Arc<EventInstance>>,
    ) -> EventStore {
        let mut next = self.clone();
        let mut touched = false;
        for def in defs {
            let same = next.defs.get(&def.def_id).is_some_and(|d| Arc::ptr_eq(d, &def));
            if !same {
                next.defs.insert(def.def_id.clone(), def);
                touched = true;
            }
        }
        for instance in instances {
            let same = next
                .instances
                .get(&instance.instance_id)
                .is_some_and(|i| Arc::ptr_eq(i, &instance));
            if !same {
                next.instances.insert(instance.instance_id.clone(), instance);
                touched = true;
            }
        }
        if touched { next.changed(self) } else { next }
    }

    fn check_integrity(&self) {
        debug_assert!(
            self.instances.values().all(|i| self.defs.contains_key(&i.def_id)),
            "event instance references a missing definition"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::DateInput;
    use crate::event::parse::{ParsedEvent, parse_event};
    use crate::event::input::EventInput;
    use crate::marker::Marker;
    use crate::options::CalendarOptions;

    fn mk(s: &str) -> Marker {
        DateEnv::utc().create_marker(&DateInput::from(s)).unwrap()
    }

    fn parsed(json: serde_json::Value) -> ParsedEvent {
        let input: EventInput = serde_json::from_value(json).unwrap();
        parse_event(
            input,
            Some("main"),
            &DateEnv::utc(),
            &ParseSettings::from_options(&CalendarOptions::default()),
        )
        .unwrap()
    }

    fn store_of(events: Vec<serde_json::Value>) -> EventStore {
        events.into_iter().fold(EventStore::new(), |store, json| {
            let ParsedEvent { def, instance } = parsed(json);
            store.add(def, instance)
        })
    }

    #[test]
    fn test_remove_def_cascades_and_shares_rest() {
        let store = store_of(vec![
            serde_json::json!({"id": "a", "start": "2024-01-05"}),
            serde_json::json!({"id": "b", "start": "2024-01-06"}),
        ]);
        let a = Arc::clone(store.find_by_public_id("a").unwrap());
        let b = Arc::clone(store.find_by_public_id("b").unwrap());

        let removed = store.remove_def(&a.def_id);
        assert!(removed.def(&a.def_id).is_none());
        assert_eq!(removed.instances_of(&a.def_id).count(), 0);
        assert!(Arc::ptr_eq(removed.def(&b.def_id).unwrap(), &b));
        let b_instance = store.instances_of(&b.def_id).next().unwrap();
        assert!(Arc::ptr_eq(
            removed.instance(&b_instance.instance_id).unwrap(),
            b_instance
        ));
        assert!(removed.revision() > store.revision());

        let same = store.remove_def("missing");
        assert_eq!(same.revision(), store.revision());
        assert_eq!(same.defs().len(), 2);
    }

    #[test]
    fn test_relevant_events_follow_group() {
        let store = store_of(vec![
            serde_json::json!({"id": "a", "groupId": "g", "start": "2024-01-05"}),
            serde_json::json!({"id": "b", "groupId": "g", "start": "2024-01-06"}),
            serde_json::json!({"id": "c", "start": "2024-01-07"}),
        ]);
        let a = store.find_by_public_id("a").unwrap();
        let instance_id = store.instances_of(&a.def_id).next().unwrap().instance_id.clone();
        let relevant = store.relevant_events(&instance_id);
        assert_eq!(relevant.defs().len(), 2);
        assert_eq!(relevant.instances().len(), 2);
        assert!(store.relevant_events("nope").is_empty());

        let rest = store.exclude_sub_store(&relevant);
        assert_eq!(rest.defs().len(), 1);
        assert_eq!(rest.merge(&relevant).defs().len(), 3);
    }

    #[test]
    fn test_exclude_source() {
        let store = store_of(vec![serde_json::json!({"start": "2024-01-05"})]);
        assert!(store.exclude_source("main").is_empty());
        assert_eq!(store.exclude_source("other").defs().len(), 1);
    }

    #[test]
    fn test_expand_recurring_replaces_window() {
        let store = store_of(vec![
            serde_json::json!({"daysOfWeek": [1], "startTime": "10:00"}),
            serde_json::json!({"start": "2024-01-05"}),
        ]);
        let env = DateEnv::utc();
        let settings = ParseSettings::from_options(&CalendarOptions::default());
        let jan = DateRange::new(mk("2024-01-01"), mk("2024-02-01")).unwrap();
        let expanded = store.expand_recurring(&jan, &env, &settings);
        assert_eq!(expanded.instances().len(), 6);

        let week = DateRange::new(mk("2024-01-07"), mk("2024-01-14")).unwrap();
        let narrowed = expanded.expand_recurring(&week, &env, &settings);
        assert_eq!(narrowed.instances().len(), 2);
        let monday = narrowed
            .instances()
            .values()
            .find(|i| i.range.start == mk("2024-01-08T10:00"))
            .unwrap();
        assert_eq!(monday.range.end, mk("2024-01-08T11:00"));
    }

    #[test]
    fn test_rezone_keeps_instant() {
        let store = store_of(vec![
            serde_json::json!({"start": "2024-01-05T15:00:00"}),
            serde_json::json!({"start": "2024-01-06"}),
        ]);
        let utc = DateEnv::utc();
        let ny = DateEnv::new(crate::env::DateEnvSettings {
            time_zone: crate::env::TimeZoneSetting::Named("America/New_York".into()),
            ..Default::default()
        })
        .unwrap();
        let rezoned = store.rezone(&utc, &ny);
        let mut starts: Vec<Marker> = rezoned.instances().values().map(|i| i.range.start).collect();
        starts.sort();
        assert_eq!(starts, vec![mk("2024-01-05T10:00:00"), mk("2024-01-06")]);
    }
}
