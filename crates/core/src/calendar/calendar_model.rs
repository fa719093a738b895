//! Recurrence policy models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How often a recurring obligation comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceKind {
    Weekly,
    Biweekly,
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

impl RecurrenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceKind::Weekly => "weekly",
            RecurrenceKind::Biweekly => "biweekly",
            RecurrenceKind::Monthly => "monthly",
            RecurrenceKind::Quarterly => "quarterly",
            RecurrenceKind::Yearly => "yearly",
        }
    }

    /// Week-based kinds are scheduled by weekday rather than day-of-month.
    pub fn is_weekday_based(&self) -> bool {
        matches!(self, RecurrenceKind::Weekly | RecurrenceKind::Biweekly)
    }

    /// Parses a stored value, treating anything unrecognized as monthly.
    pub fn from_stored(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl fmt::Display for RecurrenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurrenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(RecurrenceKind::Weekly),
            "biweekly" => Ok(RecurrenceKind::Biweekly),
            "monthly" => Ok(RecurrenceKind::Monthly),
            "quarterly" => Ok(RecurrenceKind::Quarterly),
            "yearly" => Ok(RecurrenceKind::Yearly),
            other => Err(format!("Unknown recurrence kind: {}", other)),
        }
    }
}

/// Calendar fields that drive due-date computation.
///
/// Every field is optional; missing or out-of-range values fall back to the
/// anchor date and then to "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RecurrencePolicy {
    pub kind: RecurrenceKind,
    /// Day of month, 1-31.
    pub billing_day: Option<u32>,
    /// Monday = 0 through Sunday = 6.
    pub billing_weekday: Option<u32>,
    /// Anchor month, 1-12.
    pub billing_month: Option<u32>,
    pub anchor_date: Option<NaiveDate>,
}

impl RecurrencePolicy {
    pub fn new(kind: RecurrenceKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn with_billing_day(mut self, day: u32) -> Self {
        self.billing_day = Some(day);
        self
    }

    pub fn with_billing_weekday(mut self, weekday: u32) -> Self {
        self.billing_weekday = Some(weekday);
        self
    }

    pub fn with_billing_month(mut self, month: u32) -> Self {
        self.billing_month = Some(month);
        self
    }

    pub fn with_anchor_date(mut self, anchor: NaiveDate) -> Self {
        self.anchor_date = Some(anchor);
        self
    }
}
