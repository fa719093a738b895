//! Confirmations - reconciling user answers into bills and the ledger.

mod confirmation_service;


pub use confirmation_service::{ConfirmationOutcome, ConfirmationService};
