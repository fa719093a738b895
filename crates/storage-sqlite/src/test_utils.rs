//! Shared fixtures for repository tests.

use billwise_core::recurring::{
    NewRecurringExpense, RecurringExpense, RecurringExpenseUpdate, RecurringRepositoryTrait,
    RecurringStatus,
};
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

use crate::db::{create_pool, init, run_migrations, spawn_writer, DbPool, WriteHandle};
use crate::recurring::RecurringRepository;

/// A migrated database in a fresh temp dir. Keep the `TempDir` alive for the
/// duration of the test.
pub fn setup() -> (TempDir, Arc<DbPool>, WriteHandle) {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("test.db");
    let path = init(path.to_str().expect("utf-8 path")).expect("init db");
    let pool = create_pool(&path).expect("pool");
    run_migrations(&pool).expect("migrations");
    let writer = spawn_writer((*pool).clone());
    (dir, pool, writer)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn detected(user_id: &str, recurrence_id: &str) -> NewRecurringExpense {
    NewRecurringExpense {
        user_id: user_id.to_string(),
        service_name: "Internet".to_string(),
        recurrence_id: recurrence_id.to_string(),
        normalized_merchant: Some("ISP".to_string()),
        description: None,
        category: Some("utilities".to_string()),
        amount: dec!(50000),
        currency: None,
        recurrence: Default::default(),
        billing_day: None,
        billing_weekday: None,
        billing_month: Some(1),
        anchor_date: Some(date(2025, 1, 5)),
        timezone: None,
        source_tx_id: Some("TX-source".to_string()),
        auto_add_transaction: true,
    }
}

/// Gives the expense a monthly billing day and makes it active.
pub async fn activate(
    repo: &RecurringRepository,
    expense: &RecurringExpense,
    billing_day: u32,
) -> RecurringExpense {
    let mut update = RecurringExpenseUpdate::from(expense);
    update.billing_day = Some(billing_day);
    update.status = RecurringStatus::Active;
    repo.update(update).await.expect("activate")
}
