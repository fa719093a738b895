//! SQLite storage implementation for Billwise.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `billwise-core` and contains:
//! - Database connection pooling and the single-writer actor
//! - Embedded Diesel migrations
//! - Repository implementations for recurring expenses, bills, the ledger and channels
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//! The engine in `billwise-core` is database-agnostic and works with traits.
//!
//! ```text
//!          core (engine, traits)
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod bills;
pub mod channels;
pub mod ledger;
pub mod recurring;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

// Re-export storage errors
pub use errors::StorageError;

// Re-export from billwise-core for convenience
pub use billwise_core::errors::{DatabaseError, Error, Result};
