use std::thread;
use std::time::Duration;

use crate::engine::Control;
use crate::error::WebSqlError;

use super::{SqliteEngine, run_blocking};

const ROLLBACK_BUSY_RETRIES: &[Duration] = &[
    Duration::from_millis(10),
    Duration::from_millis(25),
    Duration::from_millis(50),
];

fn is_busy(err: &WebSqlError) -> bool {
    matches!(
        err,
        WebSqlError::SqliteError(rusqlite::Error::SqliteFailure(inner, _))
            if inner.code == rusqlite::ErrorCode::DatabaseBusy
    )
}

/// Roll back, retrying briefly while another connection holds the lock.
///
/// `SQLite` rolls some failures back on its own; a connection already in autocommit
/// mode has nothing left to undo.
pub(crate) fn rollback_with_busy_retries(conn: &rusqlite::Connection) -> Result<(), WebSqlError> {
    for (idx, delay) in ROLLBACK_BUSY_RETRIES.iter().copied().enumerate() {
        if conn.is_autocommit() {
            return Ok(());
        }
        let result = conn.execute_batch("ROLLBACK").map_err(WebSqlError::from);
        match &result {
            Ok(()) => return result,
            Err(err) if is_busy(err) && idx + 1 < ROLLBACK_BUSY_RETRIES.len() => {
                tracing::debug!(attempt = idx + 1, "rollback busy, retrying");
                thread::sleep(delay);
            }
            Err(_) => return result,
        }
    }

    Err(WebSqlError::EngineError("rollback retries exhausted".into()))
}

fn release_query_only(conn: &rusqlite::Connection) -> Result<(), WebSqlError> {
    conn.execute_batch("PRAGMA query_only = OFF")?;
    Ok(())
}

pub(crate) fn apply_control(conn: &rusqlite::Connection, control: Control) -> Result<(), WebSqlError> {
    match control {
        Control::Begin { read_only: true } => {
            conn.execute_batch("PRAGMA query_only = ON")?;
            if let Err(err) = conn.execute_batch("BEGIN DEFERRED") {
                release_query_only(conn)?;
                return Err(err.into());
            }
            Ok(())
        }
        Control::Begin { read_only: false } => {
            conn.execute_batch("BEGIN DEFERRED")?;
            Ok(())
        }
        Control::Commit => {
            conn.execute_batch("COMMIT")?;
            release_query_only(conn)
        }
        Control::Rollback => {
            let result = rollback_with_busy_retries(conn);
            release_query_only(conn)?;
            result
        }
    }
}

impl SqliteEngine {
    /// Run a transaction-control statement on the owned connection.
    ///
    /// # Errors
    /// Returns `WebSqlError` if `SQLite` rejects the statement.
    pub async fn control(&self, control: Control) -> Result<(), WebSqlError> {
        run_blocking(self.conn_handle(), move |guard| apply_control(guard, control)).await
    }
}
