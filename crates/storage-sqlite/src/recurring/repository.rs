use async_trait::async_trait;
use billwise_core::errors::{DatabaseError, Error};
use billwise_core::recurring::{
    NewRecurringExpense, RecurringExpense, RecurringExpenseUpdate, RecurringRepositoryTrait,
    RecurringStatus,
};
use billwise_core::Result;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use std::sync::Arc;

use super::model::{NewRecurringExpenseDB, RecurringExpenseChangeset, RecurringExpenseDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::recurring_expenses;
use crate::utils::{format_date, format_timestamp};

fn not_found(id: i64) -> Error {
    Error::Database(DatabaseError::NotFound(format!("recurring expense {}", id)))
}

pub struct RecurringRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl RecurringRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        RecurringRepository { pool, writer }
    }

    /// Refreshes the detection fields of an existing row. Status, schedule and
    /// reminder settings are left as the user configured them.
    fn refresh_detected(
        conn: &mut SqliteConnection,
        existing: RecurringExpenseDB,
        new_expense: NewRecurringExpense,
        now: DateTime<Utc>,
    ) -> Result<RecurringExpenseDB> {
        let description = new_expense.description.or(existing.description);
        let category = new_expense.category.or(existing.category);
        let merchant = new_expense
            .normalized_merchant
            .or(existing.normalized_merchant);
        let anchor_date = existing
            .anchor_date
            .or(new_expense.anchor_date.map(format_date));
        let billing_month = existing.billing_month.or(new_expense
            .billing_month
            .and_then(|m| i32::try_from(m).ok()));

        let row = diesel::update(recurring_expenses::table.find(existing.id))
            .set((
                recurring_expenses::amount.eq(new_expense.amount.to_string()),
                recurring_expenses::service_name.eq(new_expense.service_name),
                recurring_expenses::description.eq(description),
                recurring_expenses::category.eq(category),
                recurring_expenses::normalized_merchant.eq(merchant),
                recurring_expenses::anchor_date.eq(anchor_date),
                recurring_expenses::billing_month.eq(billing_month),
                recurring_expenses::updated_at.eq(format_timestamp(now)),
            ))
            .returning(RecurringExpenseDB::as_returning())
            .get_result(conn)
            .map_err(StorageError::from)?;
        Ok(row)
    }
}

#[async_trait]
impl RecurringRepositoryTrait for RecurringRepository {
    fn find_by_id(&self, id: i64) -> Result<Option<RecurringExpense>> {
        let mut conn = get_connection(&self.pool)?;
        let row = recurring_expenses::table
            .find(id)
            .select(RecurringExpenseDB::as_select())
            .first::<RecurringExpenseDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(RecurringExpense::from))
    }

    fn find_by_recurrence_id(
        &self,
        user_id: &str,
        recurrence_id: &str,
    ) -> Result<Option<RecurringExpense>> {
        let mut conn = get_connection(&self.pool)?;
        let row = recurring_expenses::table
            .filter(recurring_expenses::user_id.eq(user_id))
            .filter(recurring_expenses::recurrence_id.eq(recurrence_id))
            .select(RecurringExpenseDB::as_select())
            .first::<RecurringExpenseDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(RecurringExpense::from))
    }

    fn list_active(&self) -> Result<Vec<RecurringExpense>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = recurring_expenses::table
            .filter(recurring_expenses::status.eq(RecurringStatus::Active.as_str()))
            .order(recurring_expenses::id.asc())
            .select(RecurringExpenseDB::as_select())
            .load::<RecurringExpenseDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(RecurringExpense::from).collect())
    }

    fn list_for_user(&self, user_id: &str) -> Result<Vec<RecurringExpense>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = recurring_expenses::table
            .filter(recurring_expenses::user_id.eq(user_id))
            .order(recurring_expenses::id.asc())
            .select(RecurringExpenseDB::as_select())
            .load::<RecurringExpenseDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(RecurringExpense::from).collect())
    }

    async fn upsert_detected(&self, new_expense: NewRecurringExpense) -> Result<RecurringExpense> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<RecurringExpense> {
                let now = Utc::now();
                let existing = recurring_expenses::table
                    .filter(recurring_expenses::user_id.eq(new_expense.user_id.as_str()))
                    .filter(recurring_expenses::recurrence_id.eq(new_expense.recurrence_id.as_str()))
                    .select(RecurringExpenseDB::as_select())
                    .first::<RecurringExpenseDB>(conn)
                    .optional()
                    .map_err(StorageError::from)?;

                let row = match existing {
                    Some(existing) => Self::refresh_detected(conn, existing, new_expense, now)?,
                    None => diesel::insert_into(recurring_expenses::table)
                        .values(NewRecurringExpenseDB::from_detected(new_expense, now))
                        .returning(RecurringExpenseDB::as_returning())
                        .get_result(conn)
                        .map_err(StorageError::from)?,
                };
                Ok(RecurringExpense::from(row))
            })
            .await
    }

    async fn update(&self, update: RecurringExpenseUpdate) -> Result<RecurringExpense> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<RecurringExpense> {
                let changes = RecurringExpenseChangeset::from_update(&update, Utc::now());
                let row = diesel::update(recurring_expenses::table.find(update.id))
                    .set(&changes)
                    .returning(RecurringExpenseDB::as_returning())
                    .get_result::<RecurringExpenseDB>(conn)
                    .optional()
                    .map_err(StorageError::from)?
                    .ok_or_else(|| not_found(update.id))?;
                Ok(RecurringExpense::from(row))
            })
            .await
    }

    async fn set_next_due(&self, id: i64, next_due: NaiveDate) -> Result<()> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let affected = diesel::update(recurring_expenses::table.find(id))
                    .set((
                        recurring_expenses::next_due.eq(format_date(next_due)),
                        recurring_expenses::updated_at.eq(format_timestamp(Utc::now())),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if affected == 0 {
                    return Err(not_found(id));
                }
                Ok(())
            })
            .await
    }

    async fn record_confirmation(
        &self,
        id: i64,
        next_due: NaiveDate,
        confirmed_at: DateTime<Utc>,
    ) -> Result<()> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let affected = diesel::update(recurring_expenses::table.find(id))
                    .set((
                        recurring_expenses::next_due.eq(format_date(next_due)),
                        recurring_expenses::last_confirmed_at.eq(format_timestamp(confirmed_at)),
                        recurring_expenses::updated_at.eq(format_timestamp(Utc::now())),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if affected == 0 {
                    return Err(not_found(id));
                }
                Ok(())
            })
            .await
    }
}
