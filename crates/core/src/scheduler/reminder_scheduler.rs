use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use std::sync::Arc;

use super::scheduler_model::ReminderRunReport;
use crate::bills::{BillMaterializer, BillRepositoryTrait};
use crate::errors::Result;
use crate::notifications::{ReminderDispatcher, ReminderMessage};
use crate::recurring::{RecurringExpense, RecurringRepositoryTrait};

/// Decides which reminder offsets fire today and dispatches them.
pub struct ReminderScheduler {
    recurring_repository: Arc<dyn RecurringRepositoryTrait>,
    bill_repository: Arc<dyn BillRepositoryTrait>,
    materializer: Arc<BillMaterializer>,
    dispatcher: Arc<ReminderDispatcher>,
}

impl ReminderScheduler {
    pub fn new(
        recurring_repository: Arc<dyn RecurringRepositoryTrait>,
        bill_repository: Arc<dyn BillRepositoryTrait>,
        materializer: Arc<BillMaterializer>,
        dispatcher: Arc<ReminderDispatcher>,
    ) -> Self {
        Self {
            recurring_repository,
            bill_repository,
            materializer,
            dispatcher,
        }
    }

    /// Processes every active expense whose local hour is its reminder
    /// hour. A failing expense is logged and skipped.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<ReminderRunReport> {
        let mut report = ReminderRunReport::default();
        for recurring in self.recurring_repository.list_active()? {
            if recurring.local_hour(now) != recurring.reminder_hour {
                continue;
            }
            report.expenses_due_now += 1;
            if let Err(e) = self.process(&recurring, now, &mut report).await {
                warn!(
                    "Reminder processing for recurring expense {} failed: {}",
                    recurring.id, e
                );
                report.expenses_failed += 1;
            }
        }
        Ok(report)
    }

    async fn process(
        &self,
        recurring: &RecurringExpense,
        now: DateTime<Utc>,
        report: &mut ReminderRunReport,
    ) -> Result<()> {
        let today = recurring.local_today(now);
        let instance = self.materializer.materialize(recurring, today).await?;

        for offset in recurring.remind_offsets.iter() {
            let fires_on = instance
                .due_date
                .checked_sub_signed(Duration::days(i64::from(offset)));
            if fires_on != Some(today) {
                continue;
            }
            let Ok(stored_offset) = i32::try_from(offset) else {
                continue;
            };

            let Some(reminder) = self
                .bill_repository
                .create_reminder_if_missing(instance.id, stored_offset, today)
                .await?
            else {
                debug!(
                    "Reminder (instance {}, offset {}, {}) already exists",
                    instance.id, offset, today
                );
                continue;
            };
            report.reminders_created += 1;

            let message = ReminderMessage::reminder(recurring, &instance, offset);
            if self.dispatcher.dispatch(&recurring.user_id, &message).await {
                self.bill_repository
                    .mark_reminder_sent(reminder.id, now)
                    .await?;
                report.reminders_sent += 1;
            } else {
                warn!(
                    "Reminder {} for recurring expense {} was not delivered on any channel",
                    reminder.id, recurring.id
                );
                report.reminders_undelivered += 1;
            }
        }
        Ok(())
    }
}
