use thiserror::Error;

/// Errors raised by recurring expense lifecycle commands.
#[derive(Error, Debug)]
pub enum RecurringError {
    /// Missing, or owned by a different user.
    #[error("Recurring expense {0} not found")]
    NotFound(i64),

    #[error("Recurring expense {0} is canceled")]
    Canceled(i64),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
}
