use serde::Serialize;
use tracing::debug;

use super::{DateProfile, DateProfileGenerator, view_spec_for};
use crate::env::DateEnv;
use crate::error::DatebookResult;
use crate::marker::Marker;
use crate::options::CalendarOptions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileAction {
    Prev,
    Next,
    /// Jump to "today" as given.
    Today(Marker),
    ChangeDate(Marker),
    /// Switch views, optionally re-anchoring at the same time.
    ChangeViewType {
        view_type: String,
        date: Option<Marker>,
    },
}

/// Which navigation buttons make sense for the current profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavigationState {
    pub prev_enabled: bool,
    pub next_enabled: bool,
    pub today_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct ProfileState {
    pub view_type: String,
    pub current_date: Marker,
    pub profile: DateProfile,
    generator: DateProfileGenerator,
}

impl ProfileState {
    pub fn init(
        env: &DateEnv,
        options: &CalendarOptions,
        view_type: &str,
        date: Marker,
    ) -> DatebookResult<Self> {
        let generator = DateProfileGenerator::new(env, view_spec_for(view_type)?, options)?;
        let profile = generator.build(date, None, true);
        Ok(ProfileState {
            view_type: view_type.to_string(),
            current_date: profile.current_date,
            profile,
            generator,
        })
    }

    pub fn generator(&self) -> &DateProfileGenerator {
        &self.generator
    }

    pub fn navigation(&self, now: Marker) -> NavigationState {
        let prev = self.generator.build_prev(&self.profile, self.current_date, false);
        let next = self.generator.build_next(&self.profile, self.current_date, false);
        let today = self.generator.build(now, None, false);
        NavigationState {
            prev_enabled: prev.is_valid,
            next_enabled: next.is_valid,
            today_enabled: today.is_valid && !self.profile.current_range.contains(now),
        }
    }
}

/// Apply one navigation action. PREV and NEXT that would leave the valid range
/// keep the old profile.
pub fn reduce(
    state: &ProfileState,
    action: ProfileAction,
    env: &DateEnv,
    options: &CalendarOptions,
) -> DatebookResult<ProfileState> {
    let mut next = state.clone();
    match action {
        ProfileAction::Prev => {
            let candidate = state.generator.build_prev(&state.profile, state.current_date, true);
            return Ok(step(next, candidate));
        }
        ProfileAction::Next => {
            let candidate = state.generator.build_next(&state.profile, state.current_date, true);
            return Ok(step(next, candidate));
        }
        ProfileAction::Today(date) | ProfileAction::ChangeDate(date) => {
            next.profile = state.generator.build(date, None, true);
            next.current_date = date;
        }
        ProfileAction::ChangeViewType { view_type, date } => {
            let generator = DateProfileGenerator::new(env, view_spec_for(&view_type)?, options)?;
            let anchor = date.unwrap_or(state.current_date);
            next.profile = generator.build(anchor, None, true);
            next.current_date = anchor;
            next.generator = generator;
            next.view_type = view_type;
        }
    }
    if !next.profile.current_range.contains(next.current_date) {
        next.current_date = next.profile.current_date;
    }
    Ok(next)
}

fn step(mut state: ProfileState, candidate: DateProfile) -> ProfileState {
    if !candidate.is_valid {
        debug!(view = %state.view_type, "Navigation lands outside the valid range, ignoring");
        return state;
    }
    state.current_date = candidate.current_date;
    state.profile = candidate;
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_range::{DateRange, RangeInput};
    use crate::env::DateInput;

    fn mk(s: &str) -> Marker {
        DateEnv::utc().create_marker(&DateInput::from(s)).unwrap()
    }

    fn range(a: &str, b: &str) -> DateRange {
        DateRange::new(mk(a), mk(b)).unwrap()
    }

    fn june_options() -> CalendarOptions {
        CalendarOptions {
            valid_range: Some(RangeInput {
                start: Some("2018-06-01".into()),
                end: Some("2018-07-01".into()),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_next_past_valid_range_is_noop() {
        let env = DateEnv::utc();
        let options = june_options();
        let state = ProfileState::init(&env, &options, "dayGridMonth", mk("2018-06-15")).unwrap();

        let nav = state.navigation(mk("2018-06-20"));
        assert!(!nav.prev_enabled);
        assert!(!nav.next_enabled);
        assert!(!nav.today_enabled);

        // the forced anchor is pulled back into June
        let after = reduce(&state, ProfileAction::Next, &env, &options).unwrap();
        assert_eq!(after.profile.current_range, state.profile.current_range);
        assert!(after.profile.active_range.unwrap().end <= mk("2018-07-01"));
    }

    #[test]
    fn test_week_navigation() {
        let env = DateEnv::utc();
        let options = CalendarOptions::default();
        let state = ProfileState::init(&env, &options, "timeGridWeek", mk("2018-06-13")).unwrap();
        assert_eq!(state.profile.current_range, range("2018-06-10", "2018-06-17"));

        let next = reduce(&state, ProfileAction::Next, &env, &options).unwrap();
        assert_eq!(next.profile.current_range, range("2018-06-17", "2018-06-24"));
        assert_eq!(next.current_date, mk("2018-06-17"));

        let back = reduce(&next, ProfileAction::Prev, &env, &options).unwrap();
        assert_eq!(back.profile.current_range, state.profile.current_range);

        let nav = back.navigation(mk("2018-07-04"));
        assert!(nav.prev_enabled && nav.next_enabled && nav.today_enabled);
    }

    #[test]
    fn test_change_view_resnaps_anchor() {
        let env = DateEnv::utc();
        let options = CalendarOptions::default();
        let state = ProfileState::init(&env, &options, "dayGridMonth", mk("2018-06-15")).unwrap();
        let week = reduce(
            &state,
            ProfileAction::ChangeViewType {
                view_type: "timeGridWeek".to_string(),
                date: None,
            },
            &env,
            &options,
        )
        .unwrap();
        assert_eq!(week.view_type, "timeGridWeek");
        assert_eq!(week.profile.current_range, range("2018-06-10", "2018-06-17"));
        assert_eq!(week.current_date, mk("2018-06-15"));

        let bad = reduce(
            &state,
            ProfileAction::ChangeViewType {
                view_type: "nope".to_string(),
                date: None,
            },
            &env,
            &options,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_change_date_outside_valid_range_is_clamped() {
        let env = DateEnv::utc();
        let options = june_options();
        let state = ProfileState::init(&env, &options, "timeGridDay", mk("2018-06-15")).unwrap();
        let moved = reduce(&state, ProfileAction::ChangeDate(mk("2018-09-01")), &env, &options).unwrap();
        assert_eq!(moved.profile.current_range, range("2018-06-30", "2018-07-01"));
        assert!(moved.profile.current_range.contains(moved.current_date));
    }
}
