use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::follow_up::FollowUpScheduler;
use super::overdue::OverdueSweeper;
use super::reminder_scheduler::ReminderScheduler;
use super::scheduler_model::{SchedulerSettings, TickReport};
use crate::bills::{BillMaterializer, BillRepositoryTrait};
use crate::notifications::ReminderDispatcher;
use crate::recurring::RecurringRepositoryTrait;
use crate::utils::{local_date, Clock};

/// One billing tick: overdue sweep, then follow-ups, then reminders.
///
/// At most one tick runs at a time per process; a tick that finds another
/// in flight returns immediately.
pub struct BillingTick {
    overdue: OverdueSweeper,
    follow_ups: FollowUpScheduler,
    reminders: ReminderScheduler,
    clock: Arc<dyn Clock>,
    settings: SchedulerSettings,
    running: Mutex<()>,
}

impl BillingTick {
    pub fn new(
        recurring_repository: Arc<dyn RecurringRepositoryTrait>,
        bill_repository: Arc<dyn BillRepositoryTrait>,
        dispatcher: Arc<ReminderDispatcher>,
        clock: Arc<dyn Clock>,
        settings: SchedulerSettings,
    ) -> Self {
        let materializer = Arc::new(BillMaterializer::new(
            recurring_repository.clone(),
            bill_repository.clone(),
        ));
        Self {
            overdue: OverdueSweeper::new(bill_repository.clone()),
            follow_ups: FollowUpScheduler::new(bill_repository.clone(), dispatcher.clone()),
            reminders: ReminderScheduler::new(
                recurring_repository,
                bill_repository,
                materializer,
                dispatcher,
            ),
            clock,
            settings,
            running: Mutex::new(()),
        }
    }

    /// Runs a tick, or returns `None` when one is already running.
    pub async fn run(&self) -> Option<TickReport> {
        let Ok(_guard) = self.running.try_lock() else {
            debug!("Billing tick already in progress, skipping");
            return None;
        };

        let now = self.clock.now();
        let today = local_date(now, self.settings.tz());
        let mut report = TickReport::default();

        match self.overdue.sweep(today).await {
            Ok(marked) => report.overdue_marked = marked,
            Err(e) => warn!("Overdue sweep failed: {}", e),
        }
        match self.follow_ups.run(now).await {
            Ok(follow_ups) => report.follow_ups = follow_ups,
            Err(e) => warn!("Follow-up pass failed: {}", e),
        }
        match self.reminders.run(now).await {
            Ok(reminders) => report.reminders = reminders,
            Err(e) => warn!("Reminder pass failed: {}", e),
        }

        info!(
            "Billing tick done: overdue={} follow_ups_sent={} reminders_created={} reminders_sent={} undelivered={} failed_expenses={}",
            report.overdue_marked,
            report.follow_ups.follow_ups_sent,
            report.reminders.reminders_created,
            report.reminders.reminders_sent,
            report.reminders.reminders_undelivered + report.follow_ups.follow_ups_undelivered,
            report.reminders.expenses_failed + report.follow_ups.follow_ups_failed,
        );
        Some(report)
    }
}
