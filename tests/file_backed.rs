#![cfg(feature = "sqlite")]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use websql_middleware::prelude::*;

fn open_file(path: &str) -> Result<Database, WebSqlError> {
    DatabaseOptions::builder(path)
        .version("1.0")
        .busy_timeout(Duration::from_millis(500))
        .journal_wal(true)
        .open()
}

#[tokio::test(flavor = "current_thread")]
async fn committed_work_survives_reopen_and_rolled_back_work_does_not() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("notes.db");
    let path = path.to_str().ok_or("non-utf8 temp path")?.to_string();

    {
        let db = open_file(&path)?;
        db.transaction(
            |tx| {
                tx.execute_sql(
                    "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL, pinned BOOLEAN)",
                    vec![],
                )?;
                tx.execute_sql(
                    "INSERT INTO notes (body, pinned) VALUES (?, ?)",
                    vec!["kept".into(), true.into()],
                )?;
                Ok(())
            },
            TransactionCallbacks::new(),
        );
        db.transaction(
            |tx| {
                tx.execute_sql("INSERT INTO notes (body) VALUES ('discarded')", vec![])?;
                tx.execute_sql("INSERT INTO notes (body) VALUES (NULL)", vec![])?;
                Ok(())
            },
            TransactionCallbacks::new(),
        );
        db.flush().await;
    }

    let db = open_file(&path)?;
    let rows = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&rows);
    db.read_transaction(
        move |tx| {
            tx.execute_sql_with(
                "SELECT body, pinned FROM notes ORDER BY id",
                vec![],
                StatementCallbacks::new().on_success(move |_tx, rs| {
                    let mut sink = sink.lock().unwrap();
                    for row in &rs.rows {
                        sink.push((
                            row.get("body").and_then(SqlValue::as_text).map(str::to_string),
                            row.get("pinned").and_then(SqlValue::as_bool),
                        ));
                    }
                    Ok(())
                }),
            )?;
            Ok(())
        },
        TransactionCallbacks::new(),
    );
    db.flush().await;

    assert_eq!(
        *rows.lock().unwrap(),
        vec![(Some("kept".to_string()), Some(true))]
    );
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn clones_share_one_chain() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("shared.db");
    let path = path.to_str().ok_or("non-utf8 temp path")?.to_string();
    let db = open_file(&path)?;
    let other = db.clone();

    let order = Arc::new(Mutex::new(Vec::new()));
    db.transaction(|tx| {
        tx.execute_sql("CREATE TABLE counter (n INTEGER)", vec![])?;
        tx.execute_sql("INSERT INTO counter VALUES (0)", vec![])?;
        Ok(())
    }, TransactionCallbacks::new());
    for handle in [&db, &other, &db] {
        let sink = Arc::clone(&order);
        handle.transaction(
            move |tx| {
                tx.execute_sql("UPDATE counter SET n = n + 1", vec![])?;
                tx.execute_sql_with(
                    "SELECT n FROM counter",
                    vec![],
                    StatementCallbacks::new().on_success(move |_tx, rs| {
                        let n = rs.rows.item(0).and_then(|r| r.get_by_index(0)).and_then(SqlValue::as_int).copied();
                        sink.lock().unwrap().push(n);
                        Ok(())
                    }),
                )?;
                Ok(())
            },
            TransactionCallbacks::new(),
        );
    }
    other.flush().await;

    assert_eq!(*order.lock().unwrap(), vec![Some(1), Some(2), Some(3)]);
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn unopenable_path_is_an_error() {
    let result = open_file("/nonexistent-dir/for/sure/db.sqlite");
    assert!(matches!(result, Err(WebSqlError::SqliteError(_))));
}
