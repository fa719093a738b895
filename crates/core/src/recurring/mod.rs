//! Recurring expenses module - domain models, lifecycle service, and traits.

mod recurring_errors;
mod recurring_model;
mod recurring_service;
mod recurring_traits;


pub use recurring_errors::RecurringError;
pub use recurring_model::{
    validate_reminder_hour, NewRecurringExpense, RecurringExpense, RecurringExpenseUpdate,
    RecurringStatus, RemindOffsets, ScheduleUpdate,
};
pub use recurring_service::RecurringService;
pub use recurring_traits::{RecurringRepositoryTrait, RecurringServiceTrait};
