//! Recurrence expansion for iCalendar data.
//!
//! The core is [`recur::RecurrenceRule`] and [`recur_iterator::RecurIterator`],
//! which lazily expand an RRULE from a start [`time::CalendarTime`]. Zone-aware
//! comparisons go through a [`registry::TimezoneRegistry`] of
//! [`timezone::Timezone`]s, and [`recur_set::RecurrenceSet`] merges rule
//! output with RDATE/EXDATE and overridden instances.
//!
//! The `parser`, `property`, `parameters` and `components` modules form a thin
//! data-model layer on top, turning calendar text into events whose
//! occurrences can be iterated.

pub mod components;
pub mod error;
pub mod parameters;
pub mod parser;
pub mod property;
pub mod recur;
pub mod recur_iterator;
pub mod recur_set;
pub mod registry;
pub mod text;
pub mod time;
pub mod timezone;

pub use error::{Error, RecurError, TimeError, TimezoneError};
pub use recur::{DayDesignator, EndCondition, Frequency, RecurrenceRule, RulePart};
pub use recur_iterator::{Limits, RecurIterator};
pub use recur_set::{Occurrence, OccurrenceSource, RecurrenceSet};
pub use registry::TimezoneRegistry;
pub use time::{CalendarTime, Zone};
pub use timezone::Timezone;
