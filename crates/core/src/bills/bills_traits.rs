use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::bills_model::{
    BillInstance, BillInstanceReminder, BillInstanceUpsert, BillStatus, DueFollowUp,
};
use crate::errors::Result;

/// Trait for bill instance and reminder persistence.
#[async_trait]
pub trait BillRepositoryTrait: Send + Sync {
    fn get_instance(&self, id: i64) -> Result<Option<BillInstance>>;
    fn list_instances_for_recurring(&self, recurring_id: i64) -> Result<Vec<BillInstance>>;
    fn list_reminders(&self, bill_instance_id: i64) -> Result<Vec<BillInstanceReminder>>;
    /// Unpaid (pending or overdue) instances of active parents whose
    /// follow-up date falls within one day of `around`.
    fn list_open_follow_ups(&self, around: NaiveDate) -> Result<Vec<DueFollowUp>>;

    /// Inserts the period's instance or refreshes its snapshot fields,
    /// leaving status, paid_at and tx_id untouched.
    async fn upsert_instance(&self, upsert: BillInstanceUpsert) -> Result<BillInstance>;

    /// Flips every pending instance due before `today` to overdue.
    async fn mark_overdue(&self, today: NaiveDate) -> Result<usize>;

    /// Creates the reminder row unless one already exists for the same key.
    /// Returns `None` when the row was already there.
    async fn create_reminder_if_missing(
        &self,
        bill_instance_id: i64,
        reminder_offset: i32,
        scheduled_for: NaiveDate,
    ) -> Result<Option<BillInstanceReminder>>;
    async fn mark_reminder_sent(&self, reminder_id: i64, sent_at: DateTime<Utc>) -> Result<()>;

    /// Marks the instance paid unless it already is. Returns whether this
    /// call made the transition.
    async fn mark_paid(&self, id: i64, paid_at: DateTime<Utc>, tx_id: &str) -> Result<bool>;
    /// Undoes a `mark_paid` whose follow-on work failed.
    async fn reopen_instance(
        &self,
        id: i64,
        status: BillStatus,
        follow_up_on: Option<NaiveDate>,
    ) -> Result<()>;
    /// Defers an unpaid instance: back to pending with a follow-up date.
    /// Returns false when the instance is already paid.
    async fn schedule_follow_up(&self, id: i64, follow_up_on: NaiveDate) -> Result<bool>;
    async fn clear_follow_up(&self, id: i64) -> Result<()>;
}
