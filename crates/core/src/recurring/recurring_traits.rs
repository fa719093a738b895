use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use super::recurring_model::{
    NewRecurringExpense, RecurringExpense, RecurringExpenseUpdate, ScheduleUpdate,
};
use crate::errors::Result;

/// Trait for recurring expense repository operations
#[async_trait]
pub trait RecurringRepositoryTrait: Send + Sync {
    fn find_by_id(&self, id: i64) -> Result<Option<RecurringExpense>>;
    fn find_by_recurrence_id(
        &self,
        user_id: &str,
        recurrence_id: &str,
    ) -> Result<Option<RecurringExpense>>;
    /// All expenses with status `active`, across users.
    fn list_active(&self) -> Result<Vec<RecurringExpense>>;
    fn list_for_user(&self, user_id: &str) -> Result<Vec<RecurringExpense>>;

    /// Inserts a new `pending` row, or refreshes the detection fields of the
    /// row already keyed by `(user_id, recurrence_id)`.
    async fn upsert_detected(&self, new_expense: NewRecurringExpense) -> Result<RecurringExpense>;
    async fn update(&self, update: RecurringExpenseUpdate) -> Result<RecurringExpense>;
    async fn set_next_due(&self, id: i64, next_due: NaiveDate) -> Result<()>;
    /// Persists the re-armed cycle after a bill was paid.
    async fn record_confirmation(
        &self,
        id: i64,
        next_due: NaiveDate,
        confirmed_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Trait for recurring expense lifecycle commands
#[async_trait]
pub trait RecurringServiceTrait: Send + Sync {
    async fn register_detected(&self, new_expense: NewRecurringExpense)
        -> Result<RecurringExpense>;
    async fn configure_schedule(
        &self,
        user_id: &str,
        id: i64,
        update: ScheduleUpdate,
    ) -> Result<RecurringExpense>;
    async fn pause(&self, user_id: &str, id: i64) -> Result<RecurringExpense>;
    async fn activate(&self, user_id: &str, id: i64) -> Result<RecurringExpense>;
    async fn cancel(&self, user_id: &str, id: i64) -> Result<RecurringExpense>;
    async fn update_amount(&self, user_id: &str, id: i64, amount: Decimal)
        -> Result<RecurringExpense>;
    fn get_for_user(&self, user_id: &str, id: i64) -> Result<RecurringExpense>;
    fn list_for_user(&self, user_id: &str) -> Result<Vec<RecurringExpense>>;
}
