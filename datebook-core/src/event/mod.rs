//! The event data model: definitions, instances, the store that holds them,
//! recurrence expansion and mutation.

mod def;
mod input;
mod instance;
mod mutation;
mod parse;
mod recurrence;
mod store;

pub use def::{EventDef, EventUi, RecurringDef};
pub use input::{ClassNamesInput, EventInput, IdInput, RecurrenceInput};
pub use instance::EventInstance;
pub use mutation::{EventMutation, StandardPropChanges, apply_mutation, try_apply_mutation};
pub use parse::{ParseSettings, ParsedEvent, parse_event, parse_events};
pub use recurrence::{Occurrences, RecurrenceRule};
pub use store::EventStore;
