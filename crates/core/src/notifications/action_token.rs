//! Encoded user actions attached to reminder options (`recurring:paid:42`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::ACTION_DOMAIN;
use crate::errors::ValidationError;

/// What the user answered to a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillAction {
    Paid,
    Later,
    No,
}

impl BillAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillAction::Paid => "paid",
            BillAction::Later => "later",
            BillAction::No => "no",
        }
    }
}

impl FromStr for BillAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(BillAction::Paid),
            "later" => Ok(BillAction::Later),
            "no" => Ok(BillAction::No),
            other => Err(ValidationError::MalformedAction(format!(
                "unknown outcome '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for BillAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<domain>:<outcome>:<bill_instance_id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionToken {
    pub action: BillAction,
    pub bill_instance_id: i64,
}

impl ActionToken {
    pub fn new(action: BillAction, bill_instance_id: i64) -> Self {
        Self {
            action,
            bill_instance_id,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        raw.parse()
    }
}

impl FromStr for ActionToken {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.trim().split(':');
        let (Some(domain), Some(outcome), Some(id), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ValidationError::MalformedAction(format!(
                "expected three ':'-separated parts in '{}'",
                raw
            )));
        };
        if domain != ACTION_DOMAIN {
            return Err(ValidationError::MalformedAction(format!(
                "unknown domain tag '{}'",
                domain
            )));
        }
        let action = outcome.parse::<BillAction>()?;
        let bill_instance_id = id
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                ValidationError::MalformedAction(format!("invalid bill instance id '{}'", id))
            })?;
        Ok(Self::new(action, bill_instance_id))
    }
}

impl fmt::Display for ActionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", ACTION_DOMAIN, self.action, self.bill_instance_id)
    }
}
