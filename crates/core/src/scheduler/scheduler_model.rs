use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_TIMEZONE;
use crate::utils::resolve_timezone;

/// Engine-wide scheduling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerSettings {
    /// Zone whose calendar date drives the overdue sweep.
    pub default_timezone: String,
}

impl SchedulerSettings {
    pub fn tz(&self) -> Tz {
        resolve_timezone(&self.default_timezone)
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            default_timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

/// Counters for one reminder pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRunReport {
    pub expenses_due_now: usize,
    pub reminders_created: usize,
    pub reminders_sent: usize,
    pub reminders_undelivered: usize,
    pub expenses_failed: usize,
}

/// Counters for one follow-up pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpRunReport {
    pub follow_ups_created: usize,
    pub follow_ups_sent: usize,
    pub follow_ups_undelivered: usize,
    pub follow_ups_failed: usize,
}

/// Summary of a full billing tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub overdue_marked: usize,
    pub follow_ups: FollowUpRunReport,
    pub reminders: ReminderRunReport,
}
