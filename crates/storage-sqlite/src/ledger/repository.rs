use async_trait::async_trait;
use billwise_core::ledger::{LedgerTrait, TransactionSnapshot};
use billwise_core::Result;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;

use super::model::TransactionDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::transactions;

/// Expense ledger backed by the `transactions` table.
pub struct LedgerRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl LedgerRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        LedgerRepository { pool, writer }
    }

    /// Most recent first.
    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<TransactionSnapshot>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = transactions::table
            .filter(transactions::user_id.eq(user_id))
            .order((transactions::date.desc(), transactions::created_at.desc()))
            .select(TransactionDB::as_select())
            .load::<TransactionDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(TransactionSnapshot::from).collect())
    }
}

#[async_trait]
impl LedgerTrait for LedgerRepository {
    async fn record_transaction(&self, snapshot: TransactionSnapshot) -> Result<String> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<String> {
                let row = TransactionDB::from_snapshot(snapshot, Utc::now());
                debug!(
                    "Recording {} {} for user {} ({})",
                    row.amount, row.currency, row.user_id, row.recurrence_id
                );
                let stored = diesel::insert_into(transactions::table)
                    .values(&row)
                    .returning(transactions::tx_id)
                    .get_result::<String>(conn)
                    .map_err(StorageError::from)?;
                Ok(stored)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{date, setup};
    use billwise_core::calendar::RecurrenceKind;
    use billwise_core::errors::{DatabaseError, Error};
    use billwise_core::ledger::new_tx_id;
    use rust_decimal_macros::dec;

    fn snapshot(tx_id: String) -> TransactionSnapshot {
        TransactionSnapshot {
            tx_id,
            user_id: "u1".to_string(),
            amount: dec!(50000),
            currency: "COP".to_string(),
            category: "utilities".to_string(),
            description: "Internet".to_string(),
            date: date(2025, 6, 5),
            merchant: Some("ISP".to_string()),
            recurrence: RecurrenceKind::Monthly,
            recurrence_id: "isp".to_string(),
            source: "recurring".to_string(),
        }
    }

    #[tokio::test]
    async fn test_record_transaction_returns_stored_id() {
        let (_dir, pool, writer) = setup();
        let ledger = LedgerRepository::new(pool, writer);
        let tx_id = new_tx_id();

        let stored = ledger.record_transaction(snapshot(tx_id.clone())).await.unwrap();

        assert_eq!(stored, tx_id);
        let listed = ledger.list_for_user("u1").unwrap();
        assert_eq!(listed, vec![snapshot(tx_id)]);
        assert!(ledger.list_for_user("u2").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_tx_id_is_rejected() {
        let (_dir, pool, writer) = setup();
        let ledger = LedgerRepository::new(pool, writer);

        ledger
            .record_transaction(snapshot("TX-fixed".to_string()))
            .await
            .unwrap();
        let again = ledger.record_transaction(snapshot("TX-fixed".to_string())).await;

        assert!(matches!(
            again,
            Err(Error::Database(DatabaseError::UniqueViolation(_)))
        ));
    }
}
