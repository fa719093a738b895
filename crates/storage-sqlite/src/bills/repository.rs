use async_trait::async_trait;
use billwise_core::bills::{
    BillInstance, BillInstanceReminder, BillInstanceUpsert, BillRepositoryTrait, BillStatus,
    DueFollowUp, ReminderStatus,
};
use billwise_core::errors::{DatabaseError, Error};
use billwise_core::recurring::{RecurringExpense, RecurringStatus};
use billwise_core::Result;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::upsert::excluded;
use diesel::SqliteConnection;
use std::sync::Arc;

use super::model::{BillInstanceDB, BillInstanceReminderDB, NewBillInstanceDB, NewBillInstanceReminderDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::recurring::RecurringExpenseDB;
use crate::schema::{bill_instance_reminders, bill_instances, recurring_expenses};
use crate::utils::{format_date, format_timestamp};

fn not_found(what: &str, id: i64) -> Error {
    Error::Database(DatabaseError::NotFound(format!("{} {}", what, id)))
}

fn instance_exists(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let count: i64 = bill_instances::table
        .find(id)
        .count()
        .get_result(conn)
        .map_err(StorageError::from)?;
    Ok(count > 0)
}

pub struct BillRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl BillRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        BillRepository { pool, writer }
    }
}

#[async_trait]
impl BillRepositoryTrait for BillRepository {
    fn get_instance(&self, id: i64) -> Result<Option<BillInstance>> {
        let mut conn = get_connection(&self.pool)?;
        let row = bill_instances::table
            .find(id)
            .select(BillInstanceDB::as_select())
            .first::<BillInstanceDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(BillInstance::from))
    }

    fn list_instances_for_recurring(&self, recurring_id: i64) -> Result<Vec<BillInstance>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = bill_instances::table
            .filter(bill_instances::recurring_id.eq(recurring_id))
            .order((bill_instances::period_year.asc(), bill_instances::period_month.asc()))
            .select(BillInstanceDB::as_select())
            .load::<BillInstanceDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(BillInstance::from).collect())
    }

    fn list_reminders(&self, bill_instance_id: i64) -> Result<Vec<BillInstanceReminder>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = bill_instance_reminders::table
            .filter(bill_instance_reminders::bill_instance_id.eq(bill_instance_id))
            .order(bill_instance_reminders::id.asc())
            .select(BillInstanceReminderDB::as_select())
            .load::<BillInstanceReminderDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(BillInstanceReminder::from).collect())
    }

    fn list_open_follow_ups(&self, around: NaiveDate) -> Result<Vec<DueFollowUp>> {
        let mut conn = get_connection(&self.pool)?;
        let earliest = format_date(around - Duration::days(1));
        let latest = format_date(around + Duration::days(1));
        let rows = bill_instances::table
            .inner_join(recurring_expenses::table)
            .filter(bill_instances::status.eq_any([
                BillStatus::Pending.as_str(),
                BillStatus::Overdue.as_str(),
            ]))
            .filter(bill_instances::follow_up_on.between(earliest, latest))
            .filter(recurring_expenses::status.eq(RecurringStatus::Active.as_str()))
            .order(bill_instances::id.asc())
            .select((BillInstanceDB::as_select(), RecurringExpenseDB::as_select()))
            .load::<(BillInstanceDB, RecurringExpenseDB)>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows
            .into_iter()
            .map(|(instance, recurring)| DueFollowUp {
                instance: BillInstance::from(instance),
                recurring: RecurringExpense::from(recurring),
            })
            .collect())
    }

    async fn upsert_instance(&self, upsert: BillInstanceUpsert) -> Result<BillInstance> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<BillInstance> {
                let row = diesel::insert_into(bill_instances::table)
                    .values(NewBillInstanceDB::from_upsert(upsert, Utc::now()))
                    .on_conflict((
                        bill_instances::recurring_id,
                        bill_instances::period_year,
                        bill_instances::period_month,
                    ))
                    .do_update()
                    .set((
                        bill_instances::due_date.eq(excluded(bill_instances::due_date)),
                        bill_instances::amount.eq(excluded(bill_instances::amount)),
                        bill_instances::payment_link.eq(excluded(bill_instances::payment_link)),
                        bill_instances::reference_number
                            .eq(excluded(bill_instances::reference_number)),
                        bill_instances::updated_at.eq(excluded(bill_instances::updated_at)),
                    ))
                    .returning(BillInstanceDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(BillInstance::from(row))
            })
            .await
    }

    async fn mark_overdue(&self, today: NaiveDate) -> Result<usize> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let affected = diesel::update(
                    bill_instances::table
                        .filter(bill_instances::status.eq(BillStatus::Pending.as_str()))
                        .filter(bill_instances::due_date.lt(format_date(today))),
                )
                .set((
                    bill_instances::status.eq(BillStatus::Overdue.as_str()),
                    bill_instances::updated_at.eq(format_timestamp(Utc::now())),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(affected)
            })
            .await
    }

    async fn create_reminder_if_missing(
        &self,
        bill_instance_id: i64,
        reminder_offset: i32,
        scheduled_for: NaiveDate,
    ) -> Result<Option<BillInstanceReminder>> {
        self.writer
            .exec(
                move |conn: &mut SqliteConnection| -> Result<Option<BillInstanceReminder>> {
                    // DO NOTHING returns no row when the key already exists.
                    let row = diesel::insert_into(bill_instance_reminders::table)
                        .values(NewBillInstanceReminderDB::new(
                            bill_instance_id,
                            reminder_offset,
                            scheduled_for,
                            Utc::now(),
                        ))
                        .on_conflict((
                            bill_instance_reminders::bill_instance_id,
                            bill_instance_reminders::reminder_offset,
                            bill_instance_reminders::scheduled_for,
                        ))
                        .do_nothing()
                        .returning(BillInstanceReminderDB::as_returning())
                        .get_result::<BillInstanceReminderDB>(conn)
                        .optional()
                        .map_err(StorageError::from)?;
                    Ok(row.map(BillInstanceReminder::from))
                },
            )
            .await
    }

    async fn mark_reminder_sent(&self, reminder_id: i64, sent_at: DateTime<Utc>) -> Result<()> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let affected = diesel::update(bill_instance_reminders::table.find(reminder_id))
                    .set((
                        bill_instance_reminders::status.eq(ReminderStatus::Sent.as_str()),
                        bill_instance_reminders::sent_at.eq(format_timestamp(sent_at)),
                        bill_instance_reminders::updated_at.eq(format_timestamp(Utc::now())),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if affected == 0 {
                    return Err(not_found("reminder", reminder_id));
                }
                Ok(())
            })
            .await
    }

    async fn mark_paid(&self, id: i64, paid_at: DateTime<Utc>, tx_id: &str) -> Result<bool> {
        let tx_id = tx_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                let affected = diesel::update(
                    bill_instances::table
                        .find(id)
                        .filter(bill_instances::status.ne(BillStatus::Paid.as_str())),
                )
                .set((
                    bill_instances::status.eq(BillStatus::Paid.as_str()),
                    bill_instances::paid_at.eq(format_timestamp(paid_at)),
                    bill_instances::tx_id.eq(tx_id),
                    bill_instances::follow_up_on.eq(None::<String>),
                    bill_instances::updated_at.eq(format_timestamp(Utc::now())),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;

                if affected == 0 && !instance_exists(conn, id)? {
                    return Err(not_found("bill instance", id));
                }
                Ok(affected > 0)
            })
            .await
    }

    async fn reopen_instance(
        &self,
        id: i64,
        status: BillStatus,
        follow_up_on: Option<NaiveDate>,
    ) -> Result<()> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let affected = diesel::update(bill_instances::table.find(id))
                    .set((
                        bill_instances::status.eq(status.as_str()),
                        bill_instances::paid_at.eq(None::<String>),
                        bill_instances::tx_id.eq(None::<String>),
                        bill_instances::follow_up_on.eq(follow_up_on.map(format_date)),
                        bill_instances::updated_at.eq(format_timestamp(Utc::now())),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if affected == 0 {
                    return Err(not_found("bill instance", id));
                }
                Ok(())
            })
            .await
    }

    async fn schedule_follow_up(&self, id: i64, follow_up_on: NaiveDate) -> Result<bool> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                let affected = diesel::update(
                    bill_instances::table
                        .find(id)
                        .filter(bill_instances::status.ne(BillStatus::Paid.as_str())),
                )
                .set((
                    bill_instances::status.eq(BillStatus::Pending.as_str()),
                    bill_instances::follow_up_on.eq(format_date(follow_up_on)),
                    bill_instances::updated_at.eq(format_timestamp(Utc::now())),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;

                if affected == 0 && !instance_exists(conn, id)? {
                    return Err(not_found("bill instance", id));
                }
                Ok(affected > 0)
            })
            .await
    }

    async fn clear_follow_up(&self, id: i64) -> Result<()> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let affected = diesel::update(bill_instances::table.find(id))
                    .set((
                        bill_instances::follow_up_on.eq(None::<String>),
                        bill_instances::updated_at.eq(format_timestamp(Utc::now())),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if affected == 0 {
                    return Err(not_found("bill instance", id));
                }
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurring::RecurringRepository;
    use crate::test_utils::{activate, date, detected, setup};
    use billwise_core::recurring::RecurringRepositoryTrait;
    use rust_decimal_macros::dec;

    struct Fixture {
        _dir: tempfile::TempDir,
        recurring: RecurringRepository,
        bills: BillRepository,
    }

    fn fixture() -> Fixture {
        let (dir, pool, writer) = setup();
        Fixture {
            _dir: dir,
            recurring: RecurringRepository::new(pool.clone(), writer.clone()),
            bills: BillRepository::new(pool, writer),
        }
    }

    async fn seeded_instance(f: &Fixture) -> (RecurringExpense, BillInstance) {
        let expense = f.recurring.upsert_detected(detected("u1", "isp")).await.unwrap();
        let expense = activate(&f.recurring, &expense, 5).await;
        let instance = f
            .bills
            .upsert_instance(BillInstanceUpsert::snapshot(&expense, date(2025, 6, 5)))
            .await
            .unwrap();
        (expense, instance)
    }

    #[tokio::test]
    async fn test_upsert_refreshes_snapshot_and_keeps_status() {
        let f = fixture();
        let (mut expense, first) = seeded_instance(&f).await;
        assert_eq!(first.status, BillStatus::Pending);
        f.bills.mark_overdue(date(2025, 6, 6)).await.unwrap();

        expense.amount = dec!(61000);
        expense.payment_reference = Some("REF-2".to_string());
        let second = f
            .bills
            .upsert_instance(BillInstanceUpsert::snapshot(&expense, date(2025, 6, 5)))
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.amount, dec!(61000));
        assert_eq!(second.reference_number.as_deref(), Some("REF-2"));
        assert_eq!(second.status, BillStatus::Overdue);
        assert_eq!(f.bills.list_instances_for_recurring(expense.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reminder_creation_is_idempotent() {
        let f = fixture();
        let (_, instance) = seeded_instance(&f).await;

        let first = f
            .bills
            .create_reminder_if_missing(instance.id, 3, date(2025, 6, 2))
            .await
            .unwrap();
        let second = f
            .bills
            .create_reminder_if_missing(instance.id, 3, date(2025, 6, 2))
            .await
            .unwrap();

        let reminder = first.expect("first call creates the row");
        assert_eq!(reminder.status, ReminderStatus::Pending);
        assert!(second.is_none());

        f.bills
            .mark_reminder_sent(reminder.id, Utc::now())
            .await
            .unwrap();
        let stored = f.bills.list_reminders(instance.id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, ReminderStatus::Sent);
        assert!(stored[0].sent_at.is_some());
    }

    #[tokio::test]
    async fn test_overdue_sweep_skips_paid_and_future_bills() {
        let f = fixture();
        let (expense, pending) = seeded_instance(&f).await;
        let paid = f
            .bills
            .upsert_instance(BillInstanceUpsert::snapshot(&expense, date(2025, 5, 5)))
            .await
            .unwrap();
        f.bills.mark_paid(paid.id, Utc::now(), "TX-1").await.unwrap();

        assert_eq!(f.bills.mark_overdue(date(2025, 6, 5)).await.unwrap(), 0);
        assert_eq!(f.bills.mark_overdue(date(2025, 6, 6)).await.unwrap(), 1);

        let pending = f.bills.get_instance(pending.id).unwrap().unwrap();
        let paid = f.bills.get_instance(paid.id).unwrap().unwrap();
        assert_eq!(pending.status, BillStatus::Overdue);
        assert_eq!(paid.status, BillStatus::Paid);
    }

    #[tokio::test]
    async fn test_mark_paid_only_transitions_once() {
        let f = fixture();
        let (_, instance) = seeded_instance(&f).await;
        let paid_at = Utc::now();

        assert!(f.bills.mark_paid(instance.id, paid_at, "TX-1").await.unwrap());
        assert!(!f.bills.mark_paid(instance.id, paid_at, "TX-2").await.unwrap());

        let stored = f.bills.get_instance(instance.id).unwrap().unwrap();
        assert_eq!(stored.tx_id.as_deref(), Some("TX-1"));
        assert_eq!(stored.paid_at, Some(paid_at));
        assert!(matches!(
            f.bills.mark_paid(9_999, paid_at, "TX-3").await,
            Err(Error::Database(DatabaseError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_reopen_clears_payment_fields() {
        let f = fixture();
        let (_, instance) = seeded_instance(&f).await;
        f.bills
            .mark_paid(instance.id, Utc::now(), "TX-1")
            .await
            .unwrap();

        f.bills
            .reopen_instance(instance.id, BillStatus::Pending, Some(date(2025, 6, 6)))
            .await
            .unwrap();

        let stored = f.bills.get_instance(instance.id).unwrap().unwrap();
        assert_eq!(stored.status, BillStatus::Pending);
        assert_eq!(stored.tx_id, None);
        assert_eq!(stored.paid_at, None);
        assert_eq!(stored.follow_up_on, Some(date(2025, 6, 6)));
    }

    #[tokio::test]
    async fn test_follow_ups_listed_only_for_active_parents() {
        let f = fixture();
        let (expense, instance) = seeded_instance(&f).await;

        assert!(f
            .bills
            .schedule_follow_up(instance.id, date(2025, 6, 6))
            .await
            .unwrap());
        let due = f.bills.list_open_follow_ups(date(2025, 6, 6)).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].instance.follow_up_on, Some(date(2025, 6, 6)));
        assert_eq!(due[0].recurring.id, expense.id);

        let mut paused = billwise_core::recurring::RecurringExpenseUpdate::from(&expense);
        paused.status = RecurringStatus::Paused;
        f.recurring.update(paused).await.unwrap();
        assert!(f
            .bills
            .list_open_follow_ups(date(2025, 6, 6))
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_follow_ups_listed_only_near_the_given_day() {
        let f = fixture();
        let (_, instance) = seeded_instance(&f).await;
        f.bills
            .schedule_follow_up(instance.id, date(2025, 6, 6))
            .await
            .unwrap();

        for around in [date(2025, 6, 5), date(2025, 6, 6), date(2025, 6, 7)] {
            assert_eq!(f.bills.list_open_follow_ups(around).unwrap().len(), 1);
        }
        for around in [date(2025, 6, 4), date(2025, 6, 8), date(2026, 1, 1)] {
            assert!(f.bills.list_open_follow_ups(around).unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_follow_up_resets_overdue_but_not_paid() {
        let f = fixture();
        let (_, instance) = seeded_instance(&f).await;
        f.bills.mark_overdue(date(2025, 6, 10)).await.unwrap();

        assert!(f
            .bills
            .schedule_follow_up(instance.id, date(2025, 6, 11))
            .await
            .unwrap());
        assert_eq!(
            f.bills.get_instance(instance.id).unwrap().unwrap().status,
            BillStatus::Pending
        );

        f.bills
            .mark_paid(instance.id, Utc::now(), "TX-1")
            .await
            .unwrap();
        assert!(!f
            .bills
            .schedule_follow_up(instance.id, date(2025, 6, 12))
            .await
            .unwrap());

        f.bills.clear_follow_up(instance.id).await.unwrap();
        assert_eq!(
            f.bills.get_instance(instance.id).unwrap().unwrap().follow_up_on,
            None
        );
    }
}
