//! Billing scheduler - the periodic tick and the passes it drives.

mod follow_up;
mod overdue;
mod reminder_scheduler;
mod scheduler_model;
mod tick;


pub use follow_up::FollowUpScheduler;
pub use overdue::OverdueSweeper;
pub use reminder_scheduler::ReminderScheduler;
pub use scheduler_model::{FollowUpRunReport, ReminderRunReport, SchedulerSettings, TickReport};
pub use tick::BillingTick;
