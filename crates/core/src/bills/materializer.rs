use chrono::NaiveDate;
use log::debug;
use std::sync::Arc;

use super::bills_model::{BillInstance, BillInstanceUpsert};
use super::bills_traits::BillRepositoryTrait;
use crate::calendar::next_due;
use crate::errors::Result;
use crate::recurring::{RecurringExpense, RecurringRepositoryTrait};

/// Keeps exactly one bill instance per billing period of a recurring expense.
pub struct BillMaterializer {
    recurring_repository: Arc<dyn RecurringRepositoryTrait>,
    bill_repository: Arc<dyn BillRepositoryTrait>,
}

impl BillMaterializer {
    pub fn new(
        recurring_repository: Arc<dyn RecurringRepositoryTrait>,
        bill_repository: Arc<dyn BillRepositoryTrait>,
    ) -> Self {
        Self {
            recurring_repository,
            bill_repository,
        }
    }

    /// Resolves the current due date, refreshing a missing or stale cache on
    /// the parent, then upserts the period's instance.
    pub async fn materialize(
        &self,
        recurring: &RecurringExpense,
        local_today: NaiveDate,
    ) -> Result<BillInstance> {
        let due = match recurring.next_due {
            Some(cached) if cached >= local_today => cached,
            stale => {
                let computed = next_due(&recurring.policy(), local_today);
                debug!(
                    "Refreshing next_due for recurring {}: {:?} -> {}",
                    recurring.id, stale, computed
                );
                self.recurring_repository
                    .set_next_due(recurring.id, computed)
                    .await?;
                computed
            }
        };

        self.bill_repository
            .upsert_instance(BillInstanceUpsert::snapshot(recurring, due))
            .await
    }
}
