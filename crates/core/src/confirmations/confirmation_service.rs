use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info};
use serde::Serialize;
use std::sync::Arc;

use crate::bills::{BillInstance, BillRepositoryTrait};
use crate::calendar::next_due;
use crate::errors::Result;
use crate::ledger::{new_tx_id, LedgerTrait, TransactionSnapshot};
use crate::notifications::{ActionToken, BillAction};
use crate::recurring::{RecurringExpense, RecurringRepositoryTrait};
use crate::utils::Clock;

/// Result of applying a user's answer to a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ConfirmationOutcome {
    Paid { tx_id: String },
    AlreadyPaid,
    FollowUpScheduled { on: chrono::NaiveDate },
    LeftPending,
    /// Unknown instance, or one owned by a different user.
    NotAuthorized,
}

/// Applies paid / later / no answers to bill instances.
pub struct ConfirmationService {
    recurring_repository: Arc<dyn RecurringRepositoryTrait>,
    bill_repository: Arc<dyn BillRepositoryTrait>,
    ledger: Arc<dyn LedgerTrait>,
    clock: Arc<dyn Clock>,
}

impl ConfirmationService {
    pub fn new(
        recurring_repository: Arc<dyn RecurringRepositoryTrait>,
        bill_repository: Arc<dyn BillRepositoryTrait>,
        ledger: Arc<dyn LedgerTrait>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            recurring_repository,
            bill_repository,
            ledger,
            clock,
        }
    }

    /// Parses an encoded action (`recurring:paid:42`) and applies it.
    pub async fn handle_action(&self, user_id: &str, raw_token: &str) -> Result<ConfirmationOutcome> {
        let token = ActionToken::parse(raw_token)?;
        self.confirm(user_id, token.bill_instance_id, token.action)
            .await
    }

    pub async fn confirm(
        &self,
        user_id: &str,
        bill_instance_id: i64,
        action: BillAction,
    ) -> Result<ConfirmationOutcome> {
        let Some(instance) = self.bill_repository.get_instance(bill_instance_id)? else {
            debug!("Bill instance {} not found", bill_instance_id);
            return Ok(ConfirmationOutcome::NotAuthorized);
        };
        let recurring = match self.recurring_repository.find_by_id(instance.recurring_id)? {
            Some(recurring) if recurring.user_id == user_id => recurring,
            _ => {
                info!(
                    "User {} is not allowed to act on bill instance {}",
                    user_id, bill_instance_id
                );
                return Ok(ConfirmationOutcome::NotAuthorized);
            }
        };

        let now = self.clock.now();
        match action {
            BillAction::Paid => self.confirm_paid(&recurring, &instance, now).await,
            BillAction::Later => {
                if instance.is_paid() {
                    return Ok(ConfirmationOutcome::AlreadyPaid);
                }
                let on = recurring.local_today(now) + Duration::days(1);
                if !self
                    .bill_repository
                    .schedule_follow_up(instance.id, on)
                    .await?
                {
                    return Ok(ConfirmationOutcome::AlreadyPaid);
                }
                debug!("Bill instance {} deferred to {}", instance.id, on);
                Ok(ConfirmationOutcome::FollowUpScheduled { on })
            }
            BillAction::No => {
                if instance.is_paid() {
                    return Ok(ConfirmationOutcome::AlreadyPaid);
                }
                Ok(ConfirmationOutcome::LeftPending)
            }
        }
    }

    async fn confirm_paid(
        &self,
        recurring: &RecurringExpense,
        instance: &BillInstance,
        now: DateTime<Utc>,
    ) -> Result<ConfirmationOutcome> {
        if instance.is_paid() {
            return Ok(ConfirmationOutcome::AlreadyPaid);
        }

        let snapshot = if recurring.auto_add_transaction {
            Some(TransactionSnapshot::for_bill(recurring, instance))
        } else {
            None
        };
        let tx_id = snapshot
            .as_ref()
            .map(|s| s.tx_id.clone())
            .unwrap_or_else(new_tx_id);

        // The conditional update is the claim: only one concurrent "paid"
        // gets past it, so the ledger is written at most once.
        if !self
            .bill_repository
            .mark_paid(instance.id, now, &tx_id)
            .await?
        {
            return Ok(ConfirmationOutcome::AlreadyPaid);
        }

        let tx_id = match snapshot {
            Some(snapshot) => match self.ledger.record_transaction(snapshot).await {
                Ok(recorded) => recorded,
                Err(e) => {
                    error!(
                        "Ledger write for bill instance {} failed, reopening: {}",
                        instance.id, e
                    );
                    self.bill_repository
                        .reopen_instance(instance.id, instance.status, instance.follow_up_on)
                        .await?;
                    return Err(e);
                }
            },
            None => tx_id,
        };

        let seed = instance.due_date + Duration::days(1);
        let upcoming = next_due(&recurring.policy(), seed);
        self.recurring_repository
            .record_confirmation(recurring.id, upcoming, now)
            .await?;

        info!(
            "Bill instance {} paid ({}), next due {}",
            instance.id, tx_id, upcoming
        );
        Ok(ConfirmationOutcome::Paid { tx_id })
    }
}
