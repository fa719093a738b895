use chrono::NaiveDate;
use log::debug;
use std::sync::Arc;

use crate::bills::BillRepositoryTrait;
use crate::errors::Result;

/// Flips stale pending bills to overdue.
pub struct OverdueSweeper {
    bill_repository: Arc<dyn BillRepositoryTrait>,
}

impl OverdueSweeper {
    pub fn new(bill_repository: Arc<dyn BillRepositoryTrait>) -> Self {
        Self { bill_repository }
    }

    /// Marks pending instances due before `today`. Paid and skipped
    /// instances are never touched; re-running is a no-op.
    pub async fn sweep(&self, today: NaiveDate) -> Result<usize> {
        let marked = self.bill_repository.mark_overdue(today).await?;
        debug!("Overdue sweep for {} marked {} instance(s)", today, marked);
        Ok(marked)
    }
}
