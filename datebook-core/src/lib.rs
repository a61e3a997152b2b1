//! Date, recurrence and event-store engine for calendar widgets.
//!
//! - `marker`, `duration`, `calendar_system`, `date_range`: wall-clock date
//!   arithmetic independent of any time zone
//! - `env`: time zones, locales and parsing, turning raw input into markers
//! - `format`: date and range formatting
//! - `profile`: which dates a view shows, and navigation between them
//! - `event`: event definitions, instances, recurrence and mutation
//! - `source`: fetching raw event input, with single-flight de-duplication
//! - `engine`: all of the above for one calendar instance

pub mod calendar_system;
pub mod date_range;
pub mod duration;
pub mod engine;
pub mod env;
pub mod error;
pub mod event;
pub mod format;
pub mod marker;
pub mod options;
pub mod profile;
pub mod source;
pub mod theme;

pub use date_range::{DateRange, OpenDateRange};
pub use duration::Duration;
pub use engine::{EventEngine, FetchFailure, ResolvedEvent};
pub use env::{DateEnv, DateInput};
pub use error::{DatebookError, DatebookResult};
pub use marker::Marker;
pub use options::CalendarOptions;
