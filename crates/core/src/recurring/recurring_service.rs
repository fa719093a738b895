use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use chrono_tz::Tz;
use log::{debug, info};
use rust_decimal::Decimal;
use std::sync::Arc;

use super::recurring_errors::RecurringError;
use super::recurring_model::{
    validate_reminder_hour, NewRecurringExpense, RecurringExpense, RecurringExpenseUpdate,
    RecurringStatus, RemindOffsets, ScheduleUpdate,
};
use super::recurring_traits::{RecurringRepositoryTrait, RecurringServiceTrait};
use crate::bills::BillRepositoryTrait;
use crate::calendar::{next_due, RecurrenceKind};
use crate::constants::DEFAULT_CURRENCY;
use crate::errors::{Result, ValidationError};
use crate::utils::{local_date, resolve_timezone, Clock};

/// Service for recurring expense lifecycle commands.
pub struct RecurringService {
    repository: Arc<dyn RecurringRepositoryTrait>,
    bill_repository: Arc<dyn BillRepositoryTrait>,
    clock: Arc<dyn Clock>,
    default_timezone: String,
}

impl RecurringService {
    pub fn new(
        repository: Arc<dyn RecurringRepositoryTrait>,
        bill_repository: Arc<dyn BillRepositoryTrait>,
        clock: Arc<dyn Clock>,
        default_timezone: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            bill_repository,
            clock,
            default_timezone: default_timezone.into(),
        }
    }

    /// Loads an expense the caller owns. Foreign ids look exactly like
    /// missing ones.
    fn load_owned(&self, user_id: &str, id: i64) -> Result<RecurringExpense> {
        match self.repository.find_by_id(id)? {
            Some(expense) if expense.user_id == user_id => Ok(expense),
            _ => Err(RecurringError::NotFound(id).into()),
        }
    }

    fn load_mutable(&self, user_id: &str, id: i64) -> Result<RecurringExpense> {
        let expense = self.load_owned(user_id, id)?;
        if expense.is_canceled() {
            return Err(RecurringError::Canceled(id).into());
        }
        Ok(expense)
    }

    /// Recomputes the cached due date from the expense's local today, never
    /// landing inside a period that has already been paid.
    fn refreshed_next_due(&self, expense: &RecurringExpense) -> Result<NaiveDate> {
        let today = expense.local_today(self.clock.now());
        let after_paid = self
            .bill_repository
            .list_instances_for_recurring(expense.id)?
            .into_iter()
            .filter(|instance| instance.is_paid())
            .map(|instance| first_unpaid_day(expense.recurrence, instance.due_date))
            .max();
        let seed = after_paid.map_or(today, |day| day.max(today));
        Ok(next_due(&expense.policy(), seed))
    }
}

/// First day outside the period a bill due on `due_date` belongs to. Bills
/// are keyed by month, so month-based kinds skip to the next month.
fn first_unpaid_day(kind: RecurrenceKind, due_date: NaiveDate) -> NaiveDate {
    if kind.is_weekday_based() {
        return due_date + Duration::days(1);
    }
    let (year, month) = if due_date.month() == 12 {
        (due_date.year() + 1, 1)
    } else {
        (due_date.year(), due_date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(due_date + Duration::days(1))
}

fn check_range(value: Option<u32>, range: std::ops::RangeInclusive<u32>, field: &str) -> Result<()> {
    match value {
        Some(v) if !range.contains(&v) => Err(RecurringError::InvalidSchedule(format!(
            "{} must be between {} and {}, got {}",
            field,
            range.start(),
            range.end(),
            v
        ))
        .into()),
        _ => Ok(()),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[async_trait]
impl RecurringServiceTrait for RecurringService {
    async fn register_detected(
        &self,
        mut new_expense: NewRecurringExpense,
    ) -> Result<RecurringExpense> {
        if new_expense.recurrence_id.trim().is_empty() {
            return Err(ValidationError::MissingField("recurrenceId".to_string()).into());
        }
        if new_expense.amount < Decimal::ZERO {
            return Err(ValidationError::InvalidInput(format!(
                "Recurring amount cannot be negative: {}",
                new_expense.amount
            ))
            .into());
        }
        check_range(new_expense.billing_day, 1..=31, "billing day")?;
        check_range(new_expense.billing_weekday, 0..=6, "billing weekday")?;
        check_range(new_expense.billing_month, 1..=12, "billing month")?;

        let timezone = non_blank(new_expense.timezone.take())
            .unwrap_or_else(|| self.default_timezone.clone());
        let today = local_date(self.clock.now(), resolve_timezone(&timezone));
        new_expense.timezone = Some(timezone);
        new_expense.currency = Some(
            non_blank(new_expense.currency.take())
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        );
        let anchor = *new_expense.anchor_date.get_or_insert(today);
        new_expense.billing_month.get_or_insert(anchor.month());

        debug!(
            "Registering recurring expense {} for user {}",
            new_expense.recurrence_id, new_expense.user_id
        );
        self.repository.upsert_detected(new_expense).await
    }

    async fn configure_schedule(
        &self,
        user_id: &str,
        id: i64,
        update: ScheduleUpdate,
    ) -> Result<RecurringExpense> {
        let mut expense = self.load_mutable(user_id, id)?;

        check_range(update.billing_day, 1..=31, "billing day")?;
        check_range(update.billing_weekday, 0..=6, "billing weekday")?;
        check_range(update.billing_month, 1..=12, "billing month")?;

        if let Some(day) = update.billing_day {
            expense.billing_day = Some(day);
        }
        if let Some(weekday) = update.billing_weekday {
            expense.billing_weekday = Some(weekday);
        }
        if let Some(month) = update.billing_month {
            expense.billing_month = Some(month);
        }
        if let Some(offsets) = update.remind_offsets {
            expense.remind_offsets = RemindOffsets::new(offsets)?;
        }
        if let Some(hour) = update.reminder_hour {
            expense.reminder_hour = validate_reminder_hour(hour)?;
        }
        if let Some(timezone) = non_blank(update.timezone) {
            if timezone.parse::<Tz>().is_err() {
                return Err(RecurringError::InvalidSchedule(format!(
                    "Unknown timezone: {}",
                    timezone
                ))
                .into());
            }
            expense.timezone = timezone;
        }
        if let Some(auto_add) = update.auto_add_transaction {
            expense.auto_add_transaction = auto_add;
        }
        if let Some(link) = update.payment_link {
            expense.payment_link = non_blank(Some(link));
        }
        if let Some(reference) = update.payment_reference {
            expense.payment_reference = non_blank(Some(reference));
        }

        if expense.status == RecurringStatus::Pending && expense.has_schedule() {
            info!("Recurring expense {} has a schedule, activating", id);
            expense.status = RecurringStatus::Active;
        }
        if expense.status == RecurringStatus::Active {
            expense.next_due = Some(self.refreshed_next_due(&expense)?);
        }

        self.repository
            .update(RecurringExpenseUpdate::from(&expense))
            .await
    }

    async fn pause(&self, user_id: &str, id: i64) -> Result<RecurringExpense> {
        let mut expense = self.load_mutable(user_id, id)?;
        expense.status = RecurringStatus::Paused;
        self.repository
            .update(RecurringExpenseUpdate::from(&expense))
            .await
    }

    async fn activate(&self, user_id: &str, id: i64) -> Result<RecurringExpense> {
        let mut expense = self.load_mutable(user_id, id)?;
        if !expense.has_schedule() {
            return Err(RecurringError::InvalidSchedule(
                "a billing day or weekday is required before activation".to_string(),
            )
            .into());
        }
        expense.status = RecurringStatus::Active;
        expense.next_due = Some(self.refreshed_next_due(&expense)?);
        self.repository
            .update(RecurringExpenseUpdate::from(&expense))
            .await
    }

    async fn cancel(&self, user_id: &str, id: i64) -> Result<RecurringExpense> {
        let mut expense = self.load_mutable(user_id, id)?;
        expense.status = RecurringStatus::Canceled;
        expense.canceled_at = Some(self.clock.now());
        info!("Recurring expense {} canceled by user {}", id, user_id);
        self.repository
            .update(RecurringExpenseUpdate::from(&expense))
            .await
    }

    async fn update_amount(
        &self,
        user_id: &str,
        id: i64,
        amount: Decimal,
    ) -> Result<RecurringExpense> {
        if amount < Decimal::ZERO {
            return Err(ValidationError::InvalidInput(format!(
                "Recurring amount cannot be negative: {}",
                amount
            ))
            .into());
        }
        let mut expense = self.load_mutable(user_id, id)?;
        expense.amount = amount;
        self.repository
            .update(RecurringExpenseUpdate::from(&expense))
            .await
    }

    fn get_for_user(&self, user_id: &str, id: i64) -> Result<RecurringExpense> {
        self.load_owned(user_id, id)
    }

    fn list_for_user(&self, user_id: &str) -> Result<Vec<RecurringExpense>> {
        self.repository.list_for_user(user_id)
    }
}
