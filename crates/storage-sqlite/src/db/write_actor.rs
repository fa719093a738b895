use super::DbPool;
use crate::errors::StorageError;
use billwise_core::errors::Result;
use diesel::SqliteConnection;
use log::debug;
use std::any::Any;
use tokio::sync::{mpsc, oneshot};

type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    // Return types are erased to `Box<dyn Any>` so one channel serves every job.
    #[allow(clippy::type_complexity)]
    tx: mpsc::Sender<(
        Job<Box<dyn Any + Send + 'static>>,
        oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>,
    )>,
}

impl WriteHandle {
    /// Runs `job` on the writer's dedicated connection inside an immediate
    /// transaction. An `Err` from the job rolls the transaction back.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static + Any,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                ret_tx,
            ))
            .await
            .expect("Writer actor's receiving channel was closed, indicating the actor stopped.");

        ret_rx
            .await
            .expect("Writer actor dropped the reply sender without sending a result.")
            .map(|boxed: Box<dyn Any + Send + 'static>| {
                *boxed
                    .downcast::<T>()
                    .unwrap_or_else(|_| panic!("Failed to downcast writer actor result."))
            })
    }
}

/// Spawns the single writer task. It holds one pooled connection for its
/// whole life and applies jobs one at a time, so every write to the billing
/// tables is serialized.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<(
        Job<Box<dyn Any + Send + 'static>>,
        oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>,
    )>(1024);

    tokio::spawn(async move {
        let mut conn = pool
            .get()
            .expect("Writer actor could not get a connection from the DB pool.");
        debug!("Database writer actor started");

        while let Some((job, reply_tx)) = rx.recv().await {
            let result: Result<Box<dyn Any + Send + 'static>> = conn
                .immediate_transaction::<_, StorageError, _>(|c| job(c).map_err(StorageError::from))
                .map_err(|e: StorageError| e.into());

            // The caller may have been cancelled; nothing to report to.
            let _ = reply_tx.send(result);
        }
        debug!("Database writer actor stopped");
    });

    WriteHandle { tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, get_connection, init};
    use billwise_core::Error;
    use diesel::dsl::sql;
    use diesel::sql_query;
    use diesel::sql_types::BigInt;
    use diesel::RunQueryDsl;
    use tempfile::tempdir;

    fn count_rows(pool: &DbPool) -> i64 {
        let mut conn = get_connection(pool).unwrap();
        diesel::select(sql::<BigInt>("(SELECT COUNT(*) FROM scratch)"))
            .get_result(&mut conn)
            .unwrap()
    }

    #[tokio::test]
    async fn test_failed_job_rolls_back() {
        let dir = tempdir().unwrap();
        let path = init(dir.path().join("writer.db").to_str().unwrap()).unwrap();
        let pool = create_pool(&path).unwrap();
        let writer = spawn_writer((*pool).clone());

        writer
            .exec(|conn: &mut SqliteConnection| -> Result<()> {
                sql_query("CREATE TABLE scratch (id INTEGER PRIMARY KEY)")
                    .execute(conn)
                    .map_err(StorageError::from)?;
                sql_query("INSERT INTO scratch (id) VALUES (1)")
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
            .unwrap();

        let failed = writer
            .exec(|conn: &mut SqliteConnection| -> Result<()> {
                sql_query("INSERT INTO scratch (id) VALUES (2)")
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Err(Error::Ledger("boom".to_string()))
            })
            .await;

        assert!(matches!(failed, Err(Error::Ledger(_))));
        assert_eq!(count_rows(&pool), 1);
    }
}
