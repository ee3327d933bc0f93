use std::collections::VecDeque;
use std::fmt;

use crate::classify;
use crate::error::{CallbackError, SqlError, WebSqlError};
use crate::results::ResultSet;
use crate::types::SqlValue;

/// Called with the statement's result. Returning `Err` (or panicking) turns the
/// statement into a failure that goes through its error callback.
pub type StatementSuccessCallback =
    Box<dyn FnOnce(&mut SqlTransaction, &ResultSet) -> Result<(), CallbackError> + Send>;

/// Called with the statement's error. Returning `false` suppresses the failure and
/// lets the transaction continue; `true` (or a panic) rolls it back.
pub type StatementErrorCallback = Box<dyn FnOnce(&mut SqlTransaction, &SqlError) -> bool + Send>;

/// Optional per-statement callbacks, the `onRowResult` / `onStatementError` pair.
///
/// ```rust
/// use websql_middleware::prelude::*;
///
/// let callbacks = StatementCallbacks::new()
///     .on_success(|_tx, rs| {
///         println!("inserted {:?}", rs.insert_id);
///         Ok(())
///     })
///     .on_error(|_tx, err| {
///         eprintln!("ignored: {err}");
///         false
///     });
/// # let _ = callbacks;
/// ```
#[derive(Default)]
pub struct StatementCallbacks {
    pub(crate) on_success: Option<StatementSuccessCallback>,
    pub(crate) on_error: Option<StatementErrorCallback>,
}

impl StatementCallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&mut SqlTransaction, &ResultSet) -> Result<(), CallbackError> + Send + 'static,
    {
        self.on_success = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&mut SqlTransaction, &SqlError) -> bool + Send + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for StatementCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementCallbacks")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// One queued statement. Never modified after it is queued.
pub(crate) struct StatementDescriptor {
    pub(crate) sql: String,
    pub(crate) params: Vec<SqlValue>,
    pub(crate) callbacks: StatementCallbacks,
    /// Failure recorded at queue time and surfaced instead of running the statement.
    pub(crate) forced_error: Option<SqlError>,
}

/// Transaction handed to builders and statement callbacks.
///
/// Statements are only queued here; they run after the builder returns, in queue
/// order, inside one engine transaction. Callbacks that run while the queue is being
/// executed may queue more statements: they join the tail of the same queue.
pub struct SqlTransaction {
    read_only: bool,
    finished: bool,
    queue: VecDeque<StatementDescriptor>,
    last_error: Option<SqlError>,
}

impl SqlTransaction {
    pub(crate) fn new(read_only: bool) -> Self {
        Self {
            read_only,
            finished: false,
            queue: VecDeque::new(),
            last_error: None,
        }
    }

    /// Queue a statement without callbacks.
    ///
    /// # Errors
    /// Returns `WebSqlError::TransactionFinished` once the transaction has settled.
    pub fn execute_sql(
        &mut self,
        sql: impl Into<String>,
        params: Vec<SqlValue>,
    ) -> Result<(), WebSqlError> {
        self.execute_sql_with(sql, params, StatementCallbacks::default())
    }

    /// Queue a statement with success and/or error callbacks.
    ///
    /// In a read-only transaction a statement that could write is still queued, but
    /// with a read-only violation that is reported through its error callback when
    /// its turn comes; it never reaches the engine. Transaction control statements
    /// (`BEGIN`, `COMMIT`, `END`, `ROLLBACK`, `SAVEPOINT`, `RELEASE`) are handled
    /// the same way, with code `SYNTAX_ERR`, in every transaction.
    ///
    /// # Errors
    /// Returns `WebSqlError::TransactionFinished` once the transaction has settled.
    pub fn execute_sql_with(
        &mut self,
        sql: impl Into<String>,
        params: Vec<SqlValue>,
        callbacks: StatementCallbacks,
    ) -> Result<(), WebSqlError> {
        if self.finished {
            return Err(WebSqlError::TransactionFinished);
        }
        let sql = sql.into();
        let forced_error = if classify::is_transaction_control(&sql) {
            Some(SqlError::classify(&WebSqlError::TransactionControl(sql.clone())))
        } else if self.read_only && !classify::allowed_in_read_only(&sql) {
            Some(SqlError::classify(&WebSqlError::ReadOnlyViolation(sql.clone())))
        } else {
            None
        };
        self.queue.push_back(StatementDescriptor {
            sql,
            params,
            callbacks,
            forced_error,
        });
        Ok(())
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Statements queued and not yet executed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// The most recent statement error, suppressed or not.
    #[must_use]
    pub fn last_error(&self) -> Option<&SqlError> {
        self.last_error.as_ref()
    }

    pub(crate) fn next_statement(&mut self) -> Option<StatementDescriptor> {
        if self.finished {
            return None;
        }
        self.queue.pop_front()
    }

    pub(crate) fn record_error(&mut self, error: &SqlError) {
        self.last_error = Some(error.clone());
    }

    /// Seal the transaction; anything still queued is discarded.
    pub(crate) fn finish(&mut self) {
        self.finished = true;
        self.queue.clear();
    }
}

impl fmt::Debug for SqlTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlTransaction")
            .field("read_only", &self.read_only)
            .field("finished", &self.finished)
            .field("pending", &self.queue.len())
            .field("last_error", &self.last_error)
            .finish()
    }
}
