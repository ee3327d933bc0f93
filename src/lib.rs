//! Legacy WebSQL-style transactions over an async SQL engine.
//!
//! A transaction is scripted synchronously: the builder queues statements with
//! [`transaction::SqlTransaction::execute_sql`] and returns. The queue then runs in order inside one
//! engine transaction, per-statement callbacks decide whether a failure is suppressed
//! or rolls everything back, and the transaction-level callback reports the outcome.
//!
//! ```rust,no_run
//! use websql_middleware::prelude::*;
//!
//! # async fn demo() -> Result<(), WebSqlError> {
//! let db = open_database("app.db", "1.0", "app data", 5 * 1024 * 1024)?;
//! db.transaction(
//!     |tx| {
//!         tx.execute_sql("CREATE TABLE IF NOT EXISTS t (id INTEGER PRIMARY KEY, x INT)", vec![])?;
//!         tx.execute_sql_with(
//!             "INSERT INTO t (x) VALUES (?)",
//!             vec![SqlValue::Int(1)],
//!             StatementCallbacks::new().on_success(|_tx, rs| {
//!                 println!("insertId = {:?}", rs.insert_id);
//!                 Ok(())
//!             }),
//!         )?;
//!         Ok(())
//!     },
//!     TransactionCallbacks::new()
//!         .on_error(|err| eprintln!("rolled back: {err}"))
//!         .on_complete(|| println!("committed")),
//! );
//! db.flush().await;
//! # Ok(())
//! # }
//! ```
//!
//! An error that rolls a transaction back is silently dropped when no transaction
//! error callback was given. That mirrors the legacy API; install a hook with
//! [`DatabaseOptionsBuilder::diagnostics`] to observe it.

pub mod classify;
pub mod config;
pub mod database;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod prelude;
pub mod results;
pub mod scheduler;
pub mod transaction;
pub mod types;

mod executor;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::{DatabaseOptions, DatabaseOptionsBuilder};
pub use database::Database;
#[cfg(feature = "sqlite")]
pub use database::open_database;
pub use error::{ErrorCode, SqlError, WebSqlError};
