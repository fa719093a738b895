//! Recurrence calendar - pure due-date computation.

mod calendar_model;
mod recurrence_calendar;

pub use calendar_model::{RecurrenceKind, RecurrencePolicy};
pub use recurrence_calendar::{clamped_date, days_in_month, next_due, quarter_months};
