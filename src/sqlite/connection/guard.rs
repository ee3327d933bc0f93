use rusqlite::hooks::{AuthAction, AuthContext, Authorization};

use crate::error::{SqlError, WebSqlError};

fn deny_transaction_control(ctx: AuthContext<'_>) -> Authorization {
    match ctx.action {
        AuthAction::Transaction { .. } | AuthAction::Savepoint { .. } => Authorization::Deny,
        _ => Authorization::Allow,
    }
}

/// Run one queued statement without letting it end the enclosing transaction.
///
/// Transaction control is refused while the statement is prepared, which also covers
/// `...; COMMIT` batches. Conflict clauses such as `OR ROLLBACK` can still end the
/// transaction while the statement runs; that comes back as
/// [`WebSqlError::TransactionAborted`].
pub(crate) fn run_guarded<R>(
    conn: &mut rusqlite::Connection,
    statement: impl FnOnce(&mut rusqlite::Connection) -> Result<R, WebSqlError>,
) -> Result<R, WebSqlError> {
    let inside = !conn.is_autocommit();
    conn.authorizer(Some(deny_transaction_control))?;
    let result = statement(conn);
    conn.authorizer(None::<fn(AuthContext<'_>) -> Authorization>)?;

    if inside && conn.is_autocommit() {
        let cause = match &result {
            Err(err) => SqlError::classify(err).message,
            Ok(_) => "the enclosing transaction was closed".to_string(),
        };
        tracing::warn!(%cause, "statement ended the enclosing transaction");
        return Err(WebSqlError::TransactionAborted(cause));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn begun() -> rusqlite::Connection {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, x INTEGER); BEGIN")
            .unwrap();
        conn
    }

    #[test]
    fn commit_inside_a_batch_is_not_authorized() {
        let mut conn = begun();
        let err = run_guarded(&mut conn, |c| {
            c.execute_batch("INSERT INTO t(x) VALUES (1); COMMIT")?;
            Ok(())
        })
        .unwrap_err();
        assert!(!err.ends_transaction());
        assert!(err.to_string().contains("not authorized"));
        assert!(!conn.is_autocommit());
    }

    #[test]
    fn conflict_rollback_is_reported_as_aborted() {
        let mut conn = begun();
        conn.execute_batch("INSERT INTO t(id, x) VALUES (1, 0)").unwrap();
        let err = run_guarded(&mut conn, |c| {
            c.execute_batch("INSERT OR ROLLBACK INTO t(id, x) VALUES (1, 2)")?;
            Ok(())
        })
        .unwrap_err();
        assert!(err.ends_transaction());
        assert!(conn.is_autocommit());
    }

    #[test]
    fn authorizer_is_removed_afterwards() {
        let mut conn = begun();
        run_guarded(&mut conn, |c| {
            c.execute_batch("INSERT INTO t(x) VALUES (1)")?;
            Ok(())
        })
        .unwrap();
        conn.execute_batch("COMMIT").unwrap();
        assert!(conn.is_autocommit());
    }
}
