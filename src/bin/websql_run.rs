use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::Level;
use websql_middleware::prelude::*;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run SQL statements as one WebSQL-style transaction and print the results as JSON"
)]
struct Args {
    /// Database file (`:memory:` for a throwaway database)
    #[arg(long, default_value = ":memory:")]
    db: String,
    /// Run as a read-only transaction
    #[arg(long)]
    read_only: bool,
    /// Suppress statement errors instead of rolling back
    #[arg(long)]
    continue_on_error: bool,
    #[arg(long)]
    busy_timeout_ms: Option<u64>,
    #[arg(long)]
    wal: bool,
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,
    /// Statements, executed in order
    #[arg(required = true)]
    statements: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum StatementReport {
    Ok { sql: String, result: ResultSet },
    Error { sql: String, error: SqlError },
}

#[derive(Debug, Serialize)]
struct Report {
    committed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<SqlError>,
    statements: Vec<StatementReport>,
}

type Shared<T> = Arc<Mutex<T>>;

fn push(reports: &Shared<Vec<StatementReport>>, report: StatementReport) {
    if let Ok(mut guard) = reports.lock() {
        guard.push(report);
    }
}

fn script(
    statements: Vec<String>,
    continue_on_error: bool,
    reports: &Shared<Vec<StatementReport>>,
) -> impl FnOnce(&mut SqlTransaction) -> Result<(), CallbackError> + Send + 'static {
    let reports = Arc::clone(reports);
    move |tx: &mut SqlTransaction| {
        for sql in statements {
            let ok_reports = Arc::clone(&reports);
            let err_reports = Arc::clone(&reports);
            let ok_sql = sql.clone();
            let err_sql = sql.clone();
            tx.execute_sql_with(
                sql,
                Vec::new(),
                StatementCallbacks::new()
                    .on_success(move |_tx, rs| {
                        push(
                            &ok_reports,
                            StatementReport::Ok {
                                sql: ok_sql,
                                result: rs.clone(),
                            },
                        );
                        Ok(())
                    })
                    .on_error(move |_tx, err| {
                        push(
                            &err_reports,
                            StatementReport::Error {
                                sql: err_sql,
                                error: err.clone(),
                            },
                        );
                        !continue_on_error
                    }),
            )?;
        }
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(Level::from(args.log_level))
        .init();

    let mut options = DatabaseOptions::builder(args.db.clone()).journal_wal(args.wal);
    if let Some(ms) = args.busy_timeout_ms {
        options = options.busy_timeout(Duration::from_millis(ms));
    }
    let db = match options.open() {
        Ok(db) => db,
        Err(err) => {
            eprintln!("failed to open {}: {err}", args.db);
            return ExitCode::FAILURE;
        }
    };

    let reports: Shared<Vec<StatementReport>> = Arc::new(Mutex::new(Vec::new()));
    let outcome: Shared<Option<Result<(), SqlError>>> = Arc::new(Mutex::new(None));
    let on_error = Arc::clone(&outcome);
    let on_complete = Arc::clone(&outcome);
    let callbacks = TransactionCallbacks::new()
        .on_error(move |err| {
            if let Ok(mut slot) = on_error.lock() {
                *slot = Some(Err(err));
            }
        })
        .on_complete(move || {
            if let Ok(mut slot) = on_complete.lock() {
                *slot = Some(Ok(()));
            }
        });

    let builder = script(args.statements, args.continue_on_error, &reports);
    if args.read_only {
        db.read_transaction(builder, callbacks);
    } else {
        db.transaction(builder, callbacks);
    }
    db.flush().await;

    let statements = reports
        .lock()
        .map(|mut guard| std::mem::take(&mut *guard))
        .unwrap_or_default();
    let settled = outcome.lock().ok().and_then(|mut slot| slot.take());
    let report = Report {
        committed: matches!(settled, Some(Ok(()))),
        error: settled.and_then(Result::err),
        statements,
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("failed to render report: {err}");
            return ExitCode::FAILURE;
        }
    }
    if report.committed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
