//! Database models for recurring expenses.

use billwise_core::calendar::RecurrenceKind;
use billwise_core::constants::{DEFAULT_CURRENCY, DEFAULT_REMINDER_HOUR, DEFAULT_TIMEZONE};
use billwise_core::recurring::{
    NewRecurringExpense, RecurringExpense, RecurringExpenseUpdate, RecurringStatus, RemindOffsets,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::utils::{
    format_date, format_timestamp, parse_decimal, parse_optional_date, parse_optional_timestamp,
    parse_timestamp_or_now, to_u32,
};

#[derive(Queryable, Identifiable, Selectable, Serialize, Deserialize, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::recurring_expenses)]
#[serde(rename_all = "camelCase")]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RecurringExpenseDB {
    pub id: i64,
    pub user_id: String,
    pub service_name: String,
    pub recurrence_id: String,
    pub normalized_merchant: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub amount: String,
    pub currency: String,
    pub recurrence: String,
    pub billing_day: Option<i32>,
    pub billing_weekday: Option<i32>,
    pub billing_month: Option<i32>,
    pub anchor_date: Option<String>,
    pub timezone: String,
    pub reminder_hour: i32,
    pub remind_offsets: String,
    pub next_due: Option<String>,
    pub status: String,
    pub auto_add_transaction: bool,
    pub payment_link: Option<String>,
    pub payment_reference: Option<String>,
    pub source_tx_id: Option<String>,
    pub last_confirmed_at: Option<String>,
    pub canceled_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::recurring_expenses)]
pub struct NewRecurringExpenseDB {
    pub user_id: String,
    pub service_name: String,
    pub recurrence_id: String,
    pub normalized_merchant: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub amount: String,
    pub currency: String,
    pub recurrence: String,
    pub billing_day: Option<i32>,
    pub billing_weekday: Option<i32>,
    pub billing_month: Option<i32>,
    pub anchor_date: Option<String>,
    pub timezone: String,
    pub reminder_hour: i32,
    pub remind_offsets: String,
    pub status: String,
    pub auto_add_transaction: bool,
    pub source_tx_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Every user-editable column. `None` writes NULL.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::recurring_expenses)]
#[diesel(treat_none_as_null = true)]
pub struct RecurringExpenseChangeset {
    pub amount: String,
    pub billing_day: Option<i32>,
    pub billing_weekday: Option<i32>,
    pub billing_month: Option<i32>,
    pub anchor_date: Option<String>,
    pub timezone: String,
    pub reminder_hour: i32,
    pub remind_offsets: String,
    pub next_due: Option<String>,
    pub status: String,
    pub auto_add_transaction: bool,
    pub payment_link: Option<String>,
    pub payment_reference: Option<String>,
    pub canceled_at: Option<String>,
    pub updated_at: String,
}

fn to_i32(value: Option<u32>) -> Option<i32> {
    value.and_then(|v| i32::try_from(v).ok())
}

impl From<RecurringExpenseDB> for RecurringExpense {
    fn from(db: RecurringExpenseDB) -> Self {
        let status = RecurringStatus::from_str(&db.status).unwrap_or_else(|e| {
            log::error!("Recurring expense {}: {}. Treating as paused", db.id, e);
            RecurringStatus::Paused
        });

        Self {
            id: db.id,
            user_id: db.user_id,
            service_name: db.service_name,
            recurrence_id: db.recurrence_id,
            normalized_merchant: db.normalized_merchant,
            description: db.description,
            category: db.category,
            amount: parse_decimal(&db.amount, "amount"),
            currency: db.currency,
            recurrence: RecurrenceKind::from_stored(&db.recurrence),
            billing_day: db.billing_day.and_then(to_u32),
            billing_weekday: db.billing_weekday.and_then(to_u32),
            billing_month: db.billing_month.and_then(to_u32),
            anchor_date: parse_optional_date(db.anchor_date.as_deref(), "anchor_date"),
            timezone: db.timezone,
            reminder_hour: to_u32(db.reminder_hour).unwrap_or_default(),
            remind_offsets: RemindOffsets::from_stored(&db.remind_offsets),
            next_due: parse_optional_date(db.next_due.as_deref(), "next_due"),
            status,
            auto_add_transaction: db.auto_add_transaction,
            payment_link: db.payment_link,
            payment_reference: db.payment_reference,
            source_tx_id: db.source_tx_id,
            last_confirmed_at: parse_optional_timestamp(
                db.last_confirmed_at.as_deref(),
                "last_confirmed_at",
            ),
            canceled_at: parse_optional_timestamp(db.canceled_at.as_deref(), "canceled_at"),
            created_at: parse_timestamp_or_now(&db.created_at, "created_at"),
            updated_at: parse_timestamp_or_now(&db.updated_at, "updated_at"),
        }
    }
}

impl NewRecurringExpenseDB {
    /// A freshly detected expense: `pending`, default reminder settings.
    pub fn from_detected(new_expense: NewRecurringExpense, now: DateTime<Utc>) -> Self {
        let now = format_timestamp(now);
        Self {
            user_id: new_expense.user_id,
            service_name: new_expense.service_name,
            recurrence_id: new_expense.recurrence_id,
            normalized_merchant: new_expense.normalized_merchant,
            description: new_expense.description,
            category: new_expense.category,
            amount: new_expense.amount.to_string(),
            currency: new_expense
                .currency
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            recurrence: new_expense.recurrence.as_str().to_string(),
            billing_day: to_i32(new_expense.billing_day),
            billing_weekday: to_i32(new_expense.billing_weekday),
            billing_month: to_i32(new_expense.billing_month),
            anchor_date: new_expense.anchor_date.map(format_date),
            timezone: new_expense
                .timezone
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            reminder_hour: DEFAULT_REMINDER_HOUR as i32,
            remind_offsets: RemindOffsets::default().to_json(),
            status: RecurringStatus::Pending.as_str().to_string(),
            auto_add_transaction: new_expense.auto_add_transaction,
            source_tx_id: new_expense.source_tx_id,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

impl RecurringExpenseChangeset {
    pub fn from_update(update: &RecurringExpenseUpdate, now: DateTime<Utc>) -> Self {
        Self {
            amount: update.amount.to_string(),
            billing_day: to_i32(update.billing_day),
            billing_weekday: to_i32(update.billing_weekday),
            billing_month: to_i32(update.billing_month),
            anchor_date: update.anchor_date.map(format_date),
            timezone: update.timezone.clone(),
            reminder_hour: to_i32(Some(update.reminder_hour)).unwrap_or_default(),
            remind_offsets: update.remind_offsets.to_json(),
            next_due: update.next_due.map(format_date),
            status: update.status.as_str().to_string(),
            auto_add_transaction: update.auto_add_transaction,
            payment_link: update.payment_link.clone(),
            payment_reference: update.payment_reference.clone(),
            canceled_at: update.canceled_at.map(format_timestamp),
            updated_at: format_timestamp(now),
        }
    }
}
