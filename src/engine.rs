//! The narrow capability interface the transaction core needs from a SQL engine.

use async_trait::async_trait;

use crate::error::WebSqlError;
use crate::results::Row;
use crate::types::SqlValue;

/// Transaction-control statement issued around a queued batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Open the atomic boundary. Adapters that can enforce read-only mode should.
    Begin { read_only: bool },
    Commit,
    Rollback,
}

impl Control {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Control::Begin { .. } => "BEGIN",
            Control::Commit => "COMMIT",
            Control::Rollback => "ROLLBACK",
        }
    }
}

/// Outcome of applying a mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOutcome {
    /// Rows changed by the statement itself
    pub changes: u64,
    /// Row id generated by the statement, if it inserted one
    pub last_insert_rowid: Option<i64>,
}

/// Async SQL engine consumed by the transaction core.
///
/// Implementations signal every failure by returning `Err`; the core never inspects
/// engine-specific state beyond these three calls. Opening a connection is left to each
/// adapter's constructor.
///
/// A statement that ends the engine's open transaction must fail with
/// [`WebSqlError::TransactionAborted`]. The core then stops the queue whatever the
/// statement's error callback returns.
#[async_trait]
pub trait SqlEngine: Send + Sync {
    /// Execute a transaction-control statement.
    ///
    /// # Errors
    /// Returns [`WebSqlError`] if the engine rejects the statement.
    async fn exec(&self, control: Control) -> Result<(), WebSqlError>;

    /// Run a query and return every row it produces, in order.
    ///
    /// # Errors
    /// Returns [`WebSqlError`] if preparing or stepping the statement fails.
    async fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, WebSqlError>;

    /// Apply a mutation and report its change count and generated row id.
    ///
    /// # Errors
    /// Returns [`WebSqlError`] if preparing or executing the statement fails.
    async fn run(&self, sql: &str, params: &[SqlValue]) -> Result<RunOutcome, WebSqlError>;
}
