use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::classify::{StatementKind, classify};
use crate::diagnostics::{CallbackStage, Diagnostic, Diagnostics};
use crate::engine::SqlEngine;
use crate::error::{SqlError, WebSqlError, panic_message};
use crate::results::ResultSet;
use crate::transaction::{
    SqlTransaction, StatementCallbacks, StatementDescriptor, StatementSuccessCallback,
};
use crate::types::SqlValue;

/// Aggregate result of draining a transaction's queue.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum QueueOutcome {
    Commit,
    Rollback(SqlError),
}

enum Step {
    Continue,
    Halt(SqlError),
}

/// Run every queued statement in FIFO order until the queue is empty or a failure
/// is left unsuppressed. Statements queued by callbacks along the way are picked up
/// in the same pass.
pub(crate) async fn drain(
    engine: &dyn SqlEngine,
    tx: &mut SqlTransaction,
    diagnostics: &Diagnostics,
) -> QueueOutcome {
    let mut executed = 0usize;
    while let Some(statement) = tx.next_statement() {
        executed += 1;
        if let Step::Halt(error) = run_statement(engine, tx, statement, diagnostics).await {
            tracing::debug!(executed, %error, "statement failure not suppressed; halting queue");
            return QueueOutcome::Rollback(error);
        }
    }
    tracing::debug!(executed, "queue drained");
    QueueOutcome::Commit
}

/// Execute one statement through the engine and shape the result.
pub(crate) async fn execute(
    engine: &dyn SqlEngine,
    sql: &str,
    params: &[SqlValue],
) -> Result<ResultSet, WebSqlError> {
    match classify(sql) {
        StatementKind::Query => engine.fetch_all(sql, params).await.map(ResultSet::from_rows),
        StatementKind::Mutation => engine.run(sql, params).await.map(ResultSet::from_run),
    }
}

async fn run_statement(
    engine: &dyn SqlEngine,
    tx: &mut SqlTransaction,
    statement: StatementDescriptor,
    diagnostics: &Diagnostics,
) -> Step {
    let StatementDescriptor {
        sql,
        params,
        callbacks: StatementCallbacks {
            on_success,
            on_error,
        },
        forced_error,
    } = statement;

    let mut boundary_lost = false;
    let outcome = match forced_error {
        Some(error) => Err(error),
        None => execute(engine, &sql, &params).await.map_err(|err| {
            boundary_lost = err.ends_transaction();
            SqlError::classify(&err)
        }),
    };

    let failure = match outcome {
        Ok(result) => match invoke_success(on_success, tx, &result) {
            Ok(()) => return Step::Continue,
            Err(error) => error,
        },
        Err(error) => error,
    };
    tracing::debug!(sql = %sql, error = %failure, "statement failed");
    tx.record_error(&failure);

    let Some(on_error) = on_error else {
        return Step::Halt(failure);
    };
    match catch_unwind(AssertUnwindSafe(|| on_error(tx, &failure))) {
        Ok(false) if boundary_lost => {
            tracing::debug!(sql = %sql, "engine transaction is gone; suppression ignored");
            Step::Halt(failure)
        }
        Ok(false) => {
            tracing::debug!(sql = %sql, "statement failure suppressed by its error callback");
            Step::Continue
        }
        Ok(true) => Step::Halt(failure),
        Err(payload) => {
            diagnostics.report(Diagnostic::CallbackPanicked {
                stage: CallbackStage::StatementError,
                message: panic_message(payload.as_ref()),
            });
            Step::Halt(failure)
        }
    }
}

fn invoke_success(
    callback: Option<StatementSuccessCallback>,
    tx: &mut SqlTransaction,
    result: &ResultSet,
) -> Result<(), SqlError> {
    let Some(callback) = callback else {
        return Ok(());
    };
    match catch_unwind(AssertUnwindSafe(|| callback(tx, result))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(SqlError::classify(&WebSqlError::from_callback(&err))),
        Err(payload) => Err(SqlError::classify(&WebSqlError::from_panic(
            &CallbackStage::StatementSuccess.to_string(),
            payload.as_ref(),
        ))),
    }
}
