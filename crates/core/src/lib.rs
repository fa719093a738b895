//! Billwise Core - Domain entities, services, and traits.
//!
//! This crate contains the recurring billing and reminder engine: the
//! recurrence calendar, bill materialization, the scheduler passes, and
//! confirmation handling. It is database-agnostic and defines traits that are
//! implemented by the `storage-sqlite` crate.

pub mod bills;
pub mod calendar;
pub mod confirmations;
pub mod constants;
pub mod errors;
pub mod ledger;
pub mod notifications;
pub mod recurring;
pub mod scheduler;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
