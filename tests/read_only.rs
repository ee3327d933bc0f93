#![cfg(feature = "sqlite")]

use std::sync::{Arc, Mutex};

use websql_middleware::prelude::*;

async fn seeded() -> Result<Database, WebSqlError> {
    let db = Database::open(":memory:")?;
    db.transaction(
        |tx| {
            tx.execute_sql("CREATE TABLE t (id INTEGER PRIMARY KEY, x INTEGER)", vec![])?;
            tx.execute_sql("INSERT INTO t(x) VALUES (1), (2)", vec![])?;
            Ok(())
        },
        TransactionCallbacks::new(),
    );
    db.flush().await;
    Ok(db)
}

async fn table_exists(db: &Database) -> bool {
    let found = Arc::new(Mutex::new(false));
    let slot = Arc::clone(&found);
    db.read_transaction(
        move |tx| {
            tx.execute_sql_with(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 't'",
                vec![],
                StatementCallbacks::new().on_success(move |_tx, rs| {
                    *slot.lock().unwrap() = !rs.rows.is_empty();
                    Ok(())
                }),
            )?;
            Ok(())
        },
        TransactionCallbacks::new(),
    );
    db.flush().await;
    let exists = *found.lock().unwrap();
    exists
}

#[tokio::test(flavor = "current_thread")]
async fn drop_never_applies_and_reports_through_statement_callback() -> Result<(), WebSqlError> {
    let db = seeded().await?;
    let errors = Arc::new(Mutex::new(Vec::new()));
    let statement_sink = Arc::clone(&errors);
    let tx_sink = Arc::clone(&errors);

    db.read_transaction(
        move |tx| {
            assert!(tx.is_read_only());
            tx.execute_sql_with(
                "DROP TABLE t",
                vec![],
                StatementCallbacks::new().on_error(move |_tx, err| {
                    statement_sink.lock().unwrap().push(("statement", err.clone()));
                    true
                }),
            )?;
            Ok(())
        },
        TransactionCallbacks::new().on_error(move |err| tx_sink.lock().unwrap().push(("transaction", err))),
    );
    db.flush().await;

    let errors = errors.lock().unwrap().clone();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].0, "statement");
    assert_eq!(errors[0].1.code, ErrorCode::Database);
    assert_eq!(errors[1].0, "transaction");
    assert_eq!(errors[1].1, errors[0].1);
    assert!(table_exists(&db).await);
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn suppressed_violation_lets_reads_commit() -> Result<(), WebSqlError> {
    let db = seeded().await?;
    let events = Arc::new(Mutex::new(Vec::new()));
    let on_error = Arc::clone(&events);
    let on_rows = Arc::clone(&events);
    let on_complete = Arc::clone(&events);

    db.read_transaction(
        move |tx| {
            tx.execute_sql_with(
                "  /* sneaky */ delete FROM t",
                vec![],
                StatementCallbacks::new().on_error(move |_tx, err| {
                    on_error.lock().unwrap().push(format!("violation: {}", err.code));
                    false
                }),
            )?;
            tx.execute_sql_with(
                "SELECT x FROM t ORDER BY x",
                vec![],
                StatementCallbacks::new().on_success(move |_tx, rs| {
                    on_rows.lock().unwrap().push(format!("rows: {}", rs.rows.len()));
                    Ok(())
                }),
            )?;
            Ok(())
        },
        TransactionCallbacks::new().on_complete(move || on_complete.lock().unwrap().push("committed".to_string())),
    );
    db.flush().await;

    assert_eq!(
        *events.lock().unwrap(),
        vec!["violation: DATABASE_ERR", "rows: 2", "committed"]
    );
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn pragma_assignment_counts_as_a_write() -> Result<(), WebSqlError> {
    let db = seeded().await?;
    let codes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&codes);

    db.read_transaction(
        |tx| {
            tx.execute_sql("PRAGMA table_info(t)", vec![])?;
            tx.execute_sql("PRAGMA user_version = 7", vec![])?;
            Ok(())
        },
        TransactionCallbacks::new().on_error(move |err| sink.lock().unwrap().push(err.code)),
    );
    db.flush().await;

    assert_eq!(*codes.lock().unwrap(), vec![ErrorCode::Database]);
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn writes_hidden_behind_a_query_keyword_are_refused_by_the_engine() -> Result<(), WebSqlError> {
    let db = seeded().await?;
    let codes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&codes);

    db.read_transaction(
        |tx| {
            tx.execute_sql(
                "WITH v(x) AS (SELECT 99) INSERT INTO t(x) SELECT x FROM v",
                vec![],
            )?;
            Ok(())
        },
        TransactionCallbacks::new().on_error(move |err| sink.lock().unwrap().push(err.code)),
    );
    db.flush().await;
    assert_eq!(codes.lock().unwrap().len(), 1);

    // The connection is writable again once the read transaction settles.
    let counts = Arc::new(Mutex::new(Vec::new()));
    let count_sink = Arc::clone(&counts);
    db.transaction(
        move |tx| {
            tx.execute_sql("INSERT INTO t(x) VALUES (3)", vec![])?;
            tx.execute_sql_with(
                "SELECT COUNT(*) AS n FROM t WHERE x = 99",
                vec![],
                StatementCallbacks::new().on_success(move |_tx, rs| {
                    let n = rs.rows.item(0).and_then(|r| r.get("n")).and_then(SqlValue::as_int).copied();
                    count_sink.lock().unwrap().push(n);
                    Ok(())
                }),
            )?;
            Ok(())
        },
        TransactionCallbacks::new(),
    );
    db.flush().await;
    assert_eq!(*counts.lock().unwrap(), vec![Some(0)]);
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn pragma_call_with_a_value_is_a_write() -> Result<(), WebSqlError> {
    let db = seeded().await?;
    let events = Arc::new(Mutex::new(Vec::new()));
    let refused = Arc::clone(&events);
    let version = Arc::clone(&events);

    db.read_transaction(
        move |tx| {
            tx.execute_sql_with(
                "PRAGMA user_version(7)",
                vec![],
                StatementCallbacks::new().on_error(move |_tx, err| {
                    refused.lock().unwrap().push(format!("refused: {}", err.code));
                    false
                }),
            )?;
            tx.execute_sql_with(
                "PRAGMA user_version",
                vec![],
                StatementCallbacks::new().on_success(move |_tx, rs| {
                    let v = rs.rows.item(0).and_then(|r| r.get_by_index(0)).and_then(SqlValue::as_int).copied();
                    version.lock().unwrap().push(format!("user_version: {v:?}"));
                    Ok(())
                }),
            )?;
            Ok(())
        },
        TransactionCallbacks::new(),
    );
    db.flush().await;

    assert_eq!(
        *events.lock().unwrap(),
        vec!["refused: DATABASE_ERR", "user_version: Some(0)"]
    );
    Ok(())
}
