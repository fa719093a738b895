//! Database model for ledger transactions.

use billwise_core::calendar::RecurrenceKind;
use billwise_core::ledger::TransactionSnapshot;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::{format_date, format_timestamp, parse_date, parse_decimal};

#[derive(Queryable, Insertable, Selectable, Serialize, Deserialize, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::transactions)]
#[serde(rename_all = "camelCase")]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionDB {
    pub tx_id: String,
    pub user_id: String,
    pub amount: String,
    pub currency: String,
    pub category: String,
    pub description: String,
    pub date: String,
    pub merchant: Option<String>,
    pub recurrence: String,
    pub recurrence_id: String,
    pub source: String,
    pub created_at: String,
}

impl TransactionDB {
    pub fn from_snapshot(snapshot: TransactionSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            tx_id: snapshot.tx_id,
            user_id: snapshot.user_id,
            amount: snapshot.amount.to_string(),
            currency: snapshot.currency,
            category: snapshot.category,
            description: snapshot.description,
            date: format_date(snapshot.date),
            merchant: snapshot.merchant,
            recurrence: snapshot.recurrence.as_str().to_string(),
            recurrence_id: snapshot.recurrence_id,
            source: snapshot.source,
            created_at: format_timestamp(now),
        }
    }
}

impl From<TransactionDB> for TransactionSnapshot {
    fn from(db: TransactionDB) -> Self {
        Self {
            tx_id: db.tx_id,
            user_id: db.user_id,
            amount: parse_decimal(&db.amount, "amount"),
            currency: db.currency,
            category: db.category,
            description: db.description,
            date: parse_date(&db.date, "date").unwrap_or_default(),
            merchant: db.merchant,
            recurrence: RecurrenceKind::from_stored(&db.recurrence),
            recurrence_id: db.recurrence_id,
            source: db.source,
        }
    }
}
