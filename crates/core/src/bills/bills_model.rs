//! Bill instance and reminder models.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;
use crate::recurring::RecurringExpense;

/// Status of one concrete billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    #[default]
    Pending,
    Paid,
    Skipped,
    Overdue,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Pending => "pending",
            BillStatus::Paid => "paid",
            BillStatus::Skipped => "skipped",
            BillStatus::Overdue => "overdue",
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BillStatus::Pending),
            "paid" => Ok(BillStatus::Paid),
            "skipped" => Ok(BillStatus::Skipped),
            "overdue" => Ok(BillStatus::Overdue),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown bill status: {}",
                other
            ))),
        }
    }
}

/// Dispatch state of a reminder row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    #[default]
    Pending,
    Sent,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Sent => "sent",
        }
    }
}

impl FromStr for ReminderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReminderStatus::Pending),
            "sent" => Ok(ReminderStatus::Sent),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown reminder status: {}",
                other
            ))),
        }
    }
}

/// One obligation for one billing period of a recurring expense.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillInstance {
    pub id: i64,
    pub recurring_id: i64,
    pub period_year: i32,
    pub period_month: u32,
    pub due_date: NaiveDate,
    pub status: BillStatus,
    pub amount: Decimal,
    pub payment_link: Option<String>,
    pub reference_number: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub tx_id: Option<String>,
    pub follow_up_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BillInstance {
    pub fn is_paid(&self) -> bool {
        self.status == BillStatus::Paid
    }
}

/// Snapshot written by the materializer, keyed by
/// `(recurring_id, period_year, period_month)`.
#[derive(Debug, Clone, PartialEq)]
pub struct BillInstanceUpsert {
    pub recurring_id: i64,
    pub period_year: i32,
    pub period_month: u32,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub payment_link: Option<String>,
    pub reference_number: Option<String>,
}

impl BillInstanceUpsert {
    /// Snapshots the parent's current billing fields for the period of `due_date`.
    pub fn snapshot(recurring: &RecurringExpense, due_date: NaiveDate) -> Self {
        Self {
            recurring_id: recurring.id,
            period_year: due_date.year(),
            period_month: due_date.month(),
            due_date,
            amount: recurring.amount,
            payment_link: recurring.payment_link.clone(),
            reference_number: recurring.payment_reference.clone(),
        }
    }
}

/// A dispatch record, unique per `(bill_instance_id, reminder_offset, scheduled_for)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillInstanceReminder {
    pub id: i64,
    pub bill_instance_id: i64,
    /// Days before due, or the follow-up sentinel.
    pub reminder_offset: i32,
    pub scheduled_for: NaiveDate,
    pub status: ReminderStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A deferred bill together with its parent expense.
#[derive(Debug, Clone, PartialEq)]
pub struct DueFollowUp {
    pub instance: BillInstance,
    pub recurring: RecurringExpense,
}
