use crate::classify;
use crate::engine::RunOutcome;
use crate::error::WebSqlError;
use crate::types::SqlValue;

use super::guard::run_guarded;
use super::{SqliteEngine, run_blocking};
use crate::sqlite::params::Params;

fn total_changes(conn: &rusqlite::Connection) -> Result<i64, WebSqlError> {
    Ok(conn.query_row("SELECT total_changes()", [], |row| row.get(0))?)
}

/// Apply `sql` and report what it changed.
///
/// `sqlite3_changes` and `last_insert_rowid` keep the values of the most recent
/// INSERT/UPDATE/DELETE, so a DDL statement would otherwise inherit them. Both are only
/// reported when this statement actually moved `total_changes` or the row id.
pub(crate) fn apply_mutation(
    conn: &mut rusqlite::Connection,
    sql: &str,
    params: &Params,
) -> Result<RunOutcome, WebSqlError> {
    let before_total = total_changes(conn)?;
    let before_rowid = conn.last_insert_rowid();

    let batch = match conn.prepare_cached(sql) {
        Ok(mut stmt) => {
            let mut rows = stmt.query(&params.as_refs()[..])?;
            // Drain RETURNING rows; they are not part of a mutation's result.
            while rows.next()?.is_some() {}
            false
        }
        Err(rusqlite::Error::MultipleStatement) if params.0.is_empty() => {
            conn.execute_batch(sql)?;
            true
        }
        Err(err) => return Err(err.into()),
    };

    let after_total = total_changes(conn)?;
    let changes = if after_total == before_total {
        0
    } else if batch {
        u64::try_from(after_total - before_total).unwrap_or(0)
    } else {
        conn.changes() as u64
    };

    let rowid = conn.last_insert_rowid();
    let inserted = rowid != before_rowid || (changes > 0 && classify::is_insert(sql));
    Ok(RunOutcome {
        changes,
        last_insert_rowid: inserted.then_some(rowid),
    })
}

impl SqliteEngine {
    /// Execute a mutation and return its change count and generated row id.
    ///
    /// # Errors
    /// Returns `WebSqlError` if preparing or executing the statement fails.
    pub async fn dml(&self, query: &str, params: &[SqlValue]) -> Result<RunOutcome, WebSqlError> {
        let sql_owned = query.to_owned();
        let params = Params::convert(params);
        run_blocking(self.conn_handle(), move |guard| {
            run_guarded(guard, |conn| apply_mutation(conn, &sql_owned, &params))
        })
        .await
    }
}
