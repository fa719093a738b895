//! Database models for bill instances and their reminders.

use billwise_core::bills::{
    BillInstance, BillInstanceReminder, BillInstanceUpsert, BillStatus, ReminderStatus,
};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::utils::{
    format_date, format_timestamp, parse_date, parse_decimal, parse_optional_date,
    parse_optional_timestamp, parse_timestamp_or_now, to_u32,
};

#[derive(Queryable, Identifiable, Selectable, Serialize, Deserialize, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::bill_instances)]
#[serde(rename_all = "camelCase")]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BillInstanceDB {
    pub id: i64,
    pub recurring_id: i64,
    pub period_year: i32,
    pub period_month: i32,
    pub due_date: String,
    pub status: String,
    pub amount: String,
    pub payment_link: Option<String>,
    pub reference_number: Option<String>,
    pub paid_at: Option<String>,
    pub tx_id: Option<String>,
    pub follow_up_on: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::bill_instances)]
pub struct NewBillInstanceDB {
    pub recurring_id: i64,
    pub period_year: i32,
    pub period_month: i32,
    pub due_date: String,
    pub status: String,
    pub amount: String,
    pub payment_link: Option<String>,
    pub reference_number: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Queryable, Identifiable, Selectable, Serialize, Deserialize, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::bill_instance_reminders)]
#[serde(rename_all = "camelCase")]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BillInstanceReminderDB {
    pub id: i64,
    pub bill_instance_id: i64,
    pub reminder_offset: i32,
    pub scheduled_for: String,
    pub status: String,
    pub sent_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::bill_instance_reminders)]
pub struct NewBillInstanceReminderDB {
    pub bill_instance_id: i64,
    pub reminder_offset: i32,
    pub scheduled_for: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<BillInstanceDB> for BillInstance {
    fn from(db: BillInstanceDB) -> Self {
        let status = BillStatus::from_str(&db.status).unwrap_or_else(|e| {
            log::error!("Bill instance {}: {}. Treating as pending", db.id, e);
            BillStatus::Pending
        });

        Self {
            id: db.id,
            recurring_id: db.recurring_id,
            period_year: db.period_year,
            period_month: to_u32(db.period_month).unwrap_or(1),
            due_date: parse_date(&db.due_date, "due_date").unwrap_or_default(),
            status,
            amount: parse_decimal(&db.amount, "amount"),
            payment_link: db.payment_link,
            reference_number: db.reference_number,
            paid_at: parse_optional_timestamp(db.paid_at.as_deref(), "paid_at"),
            tx_id: db.tx_id,
            follow_up_on: parse_optional_date(db.follow_up_on.as_deref(), "follow_up_on"),
            created_at: parse_timestamp_or_now(&db.created_at, "created_at"),
            updated_at: parse_timestamp_or_now(&db.updated_at, "updated_at"),
        }
    }
}

impl NewBillInstanceDB {
    pub fn from_upsert(upsert: BillInstanceUpsert, now: DateTime<Utc>) -> Self {
        let now = format_timestamp(now);
        Self {
            recurring_id: upsert.recurring_id,
            period_year: upsert.period_year,
            period_month: i32::try_from(upsert.period_month).unwrap_or(1),
            due_date: format_date(upsert.due_date),
            status: BillStatus::Pending.as_str().to_string(),
            amount: upsert.amount.to_string(),
            payment_link: upsert.payment_link,
            reference_number: upsert.reference_number,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

impl From<BillInstanceReminderDB> for BillInstanceReminder {
    fn from(db: BillInstanceReminderDB) -> Self {
        Self {
            id: db.id,
            bill_instance_id: db.bill_instance_id,
            reminder_offset: db.reminder_offset,
            scheduled_for: parse_date(&db.scheduled_for, "scheduled_for").unwrap_or_default(),
            status: ReminderStatus::from_str(&db.status).unwrap_or_default(),
            sent_at: parse_optional_timestamp(db.sent_at.as_deref(), "sent_at"),
            created_at: parse_timestamp_or_now(&db.created_at, "created_at"),
            updated_at: parse_timestamp_or_now(&db.updated_at, "updated_at"),
        }
    }
}

impl NewBillInstanceReminderDB {
    pub fn new(
        bill_instance_id: i64,
        reminder_offset: i32,
        scheduled_for: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        let now = format_timestamp(now);
        Self {
            bill_instance_id,
            reminder_offset,
            scheduled_for: format_date(scheduled_for),
            status: ReminderStatus::Pending.as_str().to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
