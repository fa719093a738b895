//! Recurring expense domain models.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::calendar::{RecurrenceKind, RecurrencePolicy};
use crate::constants::DEFAULT_REMIND_OFFSETS;
use crate::errors::ValidationError;
use crate::utils::{local_date, local_hour, resolve_timezone};

/// Lifecycle state of a recurring expense. `Canceled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecurringStatus {
    #[default]
    Pending,
    Active,
    Paused,
    Canceled,
}

impl RecurringStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurringStatus::Pending => "pending",
            RecurringStatus::Active => "active",
            RecurringStatus::Paused => "paused",
            RecurringStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for RecurringStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurringStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RecurringStatus::Pending),
            "active" => Ok(RecurringStatus::Active),
            "paused" => Ok(RecurringStatus::Paused),
            "canceled" => Ok(RecurringStatus::Canceled),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown recurring status: {}",
                other
            ))),
        }
    }
}

/// Days-before-due at which reminders fire.
///
/// Always non-empty, strictly descending, free of duplicates, and contains 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<u32>")]
pub struct RemindOffsets(Vec<u32>);

impl RemindOffsets {
    /// Validates and normalizes user-supplied offsets. Negative values are
    /// rejected; the same-day offset is added when missing.
    pub fn new<I>(values: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = i64>,
    {
        let mut offsets = Vec::new();
        for value in values {
            let offset = u32::try_from(value).map_err(|_| {
                ValidationError::InvalidInput(format!(
                    "Reminder offset must be a non-negative day count, got {}",
                    value
                ))
            })?;
            offsets.push(offset);
        }
        Ok(Self::normalized(offsets))
    }

    fn normalized(mut offsets: Vec<u32>) -> Self {
        offsets.push(0);
        offsets.sort_unstable_by(|a, b| b.cmp(a));
        offsets.dedup();
        RemindOffsets(offsets)
    }

    /// Parses the persisted JSON form. Anything unusable falls back to the
    /// default offsets so a bad row never stops a tick.
    pub fn from_stored(raw: &str) -> Self {
        match serde_json::from_str::<Vec<i64>>(raw) {
            Ok(values) if !values.is_empty() => {
                let usable: Vec<u32> = values
                    .into_iter()
                    .filter_map(|v| u32::try_from(v).ok())
                    .collect();
                if usable.is_empty() {
                    warn!("Stored remind offsets {} have no usable values, using defaults", raw);
                    return Self::default();
                }
                Self::normalized(usable)
            }
            Ok(_) => Self::default(),
            Err(e) => {
                warn!("Unparsable remind offsets '{}': {}. Using defaults", raw, e);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> String {
        // A Vec<u32> always serializes.
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[0]".to_string())
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl Default for RemindOffsets {
    fn default() -> Self {
        RemindOffsets(DEFAULT_REMIND_OFFSETS.to_vec())
    }
}

impl TryFrom<Vec<i64>> for RemindOffsets {
    type Error = ValidationError;

    fn try_from(values: Vec<i64>) -> Result<Self, Self::Error> {
        RemindOffsets::new(values)
    }
}

impl From<RemindOffsets> for Vec<u32> {
    fn from(offsets: RemindOffsets) -> Self {
        offsets.0
    }
}

/// A user's standing obligation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecurringExpense {
    pub id: i64,
    pub user_id: String,
    pub service_name: String,
    pub recurrence_id: String,
    pub normalized_merchant: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub recurrence: RecurrenceKind,
    pub billing_day: Option<u32>,
    pub billing_weekday: Option<u32>,
    pub billing_month: Option<u32>,
    pub anchor_date: Option<NaiveDate>,
    pub timezone: String,
    pub reminder_hour: u32,
    pub remind_offsets: RemindOffsets,
    pub next_due: Option<NaiveDate>,
    pub status: RecurringStatus,
    pub auto_add_transaction: bool,
    pub payment_link: Option<String>,
    pub payment_reference: Option<String>,
    pub source_tx_id: Option<String>,
    pub last_confirmed_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringExpense {
    pub fn policy(&self) -> RecurrencePolicy {
        RecurrencePolicy {
            kind: self.recurrence,
            billing_day: self.billing_day,
            billing_weekday: self.billing_weekday,
            billing_month: self.billing_month,
            anchor_date: self.anchor_date,
        }
    }

    pub fn tz(&self) -> Tz {
        resolve_timezone(&self.timezone)
    }

    /// Calendar date in the expense's own timezone.
    pub fn local_today(&self, now: DateTime<Utc>) -> NaiveDate {
        local_date(now, self.tz())
    }

    pub fn local_hour(&self, now: DateTime<Utc>) -> u32 {
        local_hour(now, self.tz())
    }

    /// A schedule is known once a day-of-month or a weekday is set.
    pub fn has_schedule(&self) -> bool {
        self.billing_day.is_some() || self.billing_weekday.is_some()
    }

    pub fn is_canceled(&self) -> bool {
        self.status == RecurringStatus::Canceled
    }

    /// Human-facing label used in reminders and ledger descriptions.
    pub fn display_name(&self) -> &str {
        [
            Some(self.service_name.as_str()),
            self.normalized_merchant.as_deref(),
            self.description.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .unwrap_or("Recurring payment")
    }
}

/// Input for registering a detected or user-declared recurring payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewRecurringExpense {
    pub user_id: String,
    pub service_name: String,
    pub recurrence_id: String,
    pub normalized_merchant: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub amount: Decimal,
    pub currency: Option<String>,
    #[serde(default)]
    pub recurrence: RecurrenceKind,
    pub billing_day: Option<u32>,
    pub billing_weekday: Option<u32>,
    pub billing_month: Option<u32>,
    pub anchor_date: Option<NaiveDate>,
    pub timezone: Option<String>,
    pub source_tx_id: Option<String>,
    #[serde(default)]
    pub auto_add_transaction: bool,
}

/// Fields accepted when the user configures or edits a schedule. `None`
/// leaves the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleUpdate {
    pub billing_day: Option<u32>,
    pub billing_weekday: Option<u32>,
    pub billing_month: Option<u32>,
    pub remind_offsets: Option<Vec<i64>>,
    pub reminder_hour: Option<u32>,
    pub timezone: Option<String>,
    pub auto_add_transaction: Option<bool>,
    pub payment_link: Option<String>,
    pub payment_reference: Option<String>,
}

/// Full row written back by the lifecycle service.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringExpenseUpdate {
    pub id: i64,
    pub amount: Decimal,
    pub billing_day: Option<u32>,
    pub billing_weekday: Option<u32>,
    pub billing_month: Option<u32>,
    pub anchor_date: Option<NaiveDate>,
    pub timezone: String,
    pub reminder_hour: u32,
    pub remind_offsets: RemindOffsets,
    pub next_due: Option<NaiveDate>,
    pub status: RecurringStatus,
    pub auto_add_transaction: bool,
    pub payment_link: Option<String>,
    pub payment_reference: Option<String>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl From<&RecurringExpense> for RecurringExpenseUpdate {
    fn from(expense: &RecurringExpense) -> Self {
        Self {
            id: expense.id,
            amount: expense.amount,
            billing_day: expense.billing_day,
            billing_weekday: expense.billing_weekday,
            billing_month: expense.billing_month,
            anchor_date: expense.anchor_date,
            timezone: expense.timezone.clone(),
            reminder_hour: expense.reminder_hour,
            remind_offsets: expense.remind_offsets.clone(),
            next_due: expense.next_due,
            status: expense.status,
            auto_add_transaction: expense.auto_add_transaction,
            payment_link: expense.payment_link.clone(),
            payment_reference: expense.payment_reference.clone(),
            canceled_at: expense.canceled_at,
        }
    }
}

/// Validates a local reminder hour.
pub fn validate_reminder_hour(hour: u32) -> Result<u32, ValidationError> {
    if hour <= 23 {
        Ok(hour)
    } else {
        Err(ValidationError::InvalidInput(format!(
            "Reminder hour must be between 0 and 23, got {}",
            hour
        )))
    }
}
