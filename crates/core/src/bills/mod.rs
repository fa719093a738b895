//! Bill instances - per-period obligations, their reminders, and materialization.

mod bills_model;
mod bills_traits;
mod materializer;


pub use bills_model::{
    BillInstance, BillInstanceReminder, BillInstanceUpsert, BillStatus, DueFollowUp,
    ReminderStatus,
};
pub use bills_traits::BillRepositoryTrait;
pub use materializer::BillMaterializer;
