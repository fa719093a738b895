use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::sync::Arc;

use super::scheduler_model::FollowUpRunReport;
use crate::bills::{BillRepositoryTrait, DueFollowUp};
use crate::constants::FOLLOW_UP_OFFSET;
use crate::errors::Result;
use crate::notifications::{ReminderDispatcher, ReminderMessage};

/// Re-prompts bills the user deferred with "later".
pub struct FollowUpScheduler {
    bill_repository: Arc<dyn BillRepositoryTrait>,
    dispatcher: Arc<ReminderDispatcher>,
}

enum FollowUpResult {
    NotToday,
    AlreadyHandled,
    Sent,
    Undelivered,
}

impl FollowUpScheduler {
    pub fn new(
        bill_repository: Arc<dyn BillRepositoryTrait>,
        dispatcher: Arc<ReminderDispatcher>,
    ) -> Self {
        Self {
            bill_repository,
            dispatcher,
        }
    }

    pub async fn run(&self, now: DateTime<Utc>) -> Result<FollowUpRunReport> {
        let mut report = FollowUpRunReport::default();
        // Every local today sits within a day of the UTC date.
        for due in self
            .bill_repository
            .list_open_follow_ups(now.date_naive())?
        {
            let instance_id = due.instance.id;
            match self.process(&due, now).await {
                Ok(FollowUpResult::NotToday) | Ok(FollowUpResult::AlreadyHandled) => {}
                Ok(FollowUpResult::Sent) => {
                    report.follow_ups_created += 1;
                    report.follow_ups_sent += 1;
                }
                Ok(FollowUpResult::Undelivered) => {
                    report.follow_ups_created += 1;
                    report.follow_ups_undelivered += 1;
                }
                Err(e) => {
                    warn!("Follow-up for bill instance {} failed: {}", instance_id, e);
                    report.follow_ups_failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn process(&self, due: &DueFollowUp, now: DateTime<Utc>) -> Result<FollowUpResult> {
        let today = due.recurring.local_today(now);
        if due.instance.follow_up_on != Some(today) {
            return Ok(FollowUpResult::NotToday);
        }

        let Some(reminder) = self
            .bill_repository
            .create_reminder_if_missing(due.instance.id, FOLLOW_UP_OFFSET, today)
            .await?
        else {
            debug!(
                "Follow-up for bill instance {} on {} already handled",
                due.instance.id, today
            );
            return Ok(FollowUpResult::AlreadyHandled);
        };

        let message = ReminderMessage::follow_up(&due.recurring, &due.instance);
        if !self
            .dispatcher
            .dispatch(&due.recurring.user_id, &message)
            .await
        {
            warn!(
                "Follow-up for bill instance {} was not delivered on any channel",
                due.instance.id
            );
            return Ok(FollowUpResult::Undelivered);
        }

        self.bill_repository.clear_follow_up(due.instance.id).await?;
        self.bill_repository
            .mark_reminder_sent(reminder.id, now)
            .await?;
        Ok(FollowUpResult::Sent)
    }
}
