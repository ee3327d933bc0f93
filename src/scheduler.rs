//! Drives one transaction through `Building -> Executing -> Committed | RolledBack`.
//!
//! Building only fills the statement queue; executing only drains it. The two phases
//! never interleave: the builder has returned before the first engine call is made.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::diagnostics::{CallbackStage, Diagnostic, Diagnostics};
use crate::engine::{Control, SqlEngine};
use crate::error::{CallbackError, SqlError, WebSqlError, panic_message};
use crate::executor::{self, QueueOutcome};
use crate::transaction::SqlTransaction;

/// Script run synchronously against a new transaction to queue its statements.
pub type TransactionBuilder =
    Box<dyn FnOnce(&mut SqlTransaction) -> Result<(), CallbackError> + Send>;

/// Receives the error that rolled a transaction back.
pub type TransactionErrorCallback = Box<dyn FnOnce(SqlError) + Send>;

/// Fires once a transaction has committed.
pub type TransactionCompleteCallback = Box<dyn FnOnce() + Send>;

/// Lifecycle states of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Building,
    Executing,
    Committed,
    RolledBack,
}

/// Optional transaction-level callbacks, the `onError` / `onComplete` pair.
///
/// Without an error callback a rolled-back transaction is silent: the error only
/// reaches `tracing` and the diagnostics hook.
#[derive(Default)]
pub struct TransactionCallbacks {
    on_error: Option<TransactionErrorCallback>,
    on_complete: Option<TransactionCompleteCallback>,
}

impl TransactionCallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(SqlError) + Send + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Report a failure that happened before the transaction could be scheduled.
    pub(crate) fn fail(self, error: SqlError, diagnostics: &Diagnostics) {
        settle_rolled_back(error, false, self.on_error, diagnostics);
    }
}

impl fmt::Debug for TransactionCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionCallbacks")
            .field("on_error", &self.on_error.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// A transaction waiting in the chain.
pub(crate) struct TransactionRequest {
    pub(crate) builder: TransactionBuilder,
    pub(crate) callbacks: TransactionCallbacks,
    pub(crate) read_only: bool,
}

/// Run one transaction to settlement and fire its lifecycle callback.
pub(crate) async fn run_transaction(
    engine: &dyn SqlEngine,
    request: TransactionRequest,
    diagnostics: &Diagnostics,
) -> TransactionState {
    let TransactionRequest {
        builder,
        callbacks: TransactionCallbacks {
            on_error,
            on_complete,
        },
        read_only,
    } = request;

    let mut tx = SqlTransaction::new(read_only);
    tracing::debug!(read_only, state = ?TransactionState::Building, "transaction started");
    if let Err(error) = build(&mut tx, builder) {
        tx.finish();
        tracing::debug!(%error, "builder failed; nothing executed");
        return settle_rolled_back(error, read_only, on_error, diagnostics);
    }

    if tx.pending() == 0 {
        tx.finish();
        tracing::debug!("empty transaction");
        return settle_committed(on_complete, diagnostics);
    }

    tracing::debug!(
        pending = tx.pending(),
        state = ?TransactionState::Executing,
        "transaction built"
    );
    if let Err(err) = engine.exec(Control::Begin { read_only }).await {
        tx.finish();
        return settle_rolled_back(SqlError::classify(&err), read_only, on_error, diagnostics);
    }

    let outcome = executor::drain(engine, &mut tx, diagnostics).await;
    tx.finish();

    match outcome {
        QueueOutcome::Commit => match engine.exec(Control::Commit).await {
            Ok(()) => settle_committed(on_complete, diagnostics),
            Err(err) => {
                let error = SqlError::classify(&err);
                rollback(engine, diagnostics).await;
                settle_rolled_back(error, read_only, on_error, diagnostics)
            }
        },
        QueueOutcome::Rollback(error) => {
            rollback(engine, diagnostics).await;
            settle_rolled_back(error, read_only, on_error, diagnostics)
        }
    }
}

/// Building phase: run the builder synchronously; no engine I/O happens here.
fn build(tx: &mut SqlTransaction, builder: TransactionBuilder) -> Result<(), SqlError> {
    match catch_unwind(AssertUnwindSafe(|| builder(tx))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(SqlError::classify(&WebSqlError::BuilderError(
            err.to_string(),
        ))),
        Err(payload) => Err(SqlError::classify(&WebSqlError::from_panic(
            &CallbackStage::Builder.to_string(),
            payload.as_ref(),
        ))),
    }
}

async fn rollback(engine: &dyn SqlEngine, diagnostics: &Diagnostics) {
    if let Err(err) = engine.exec(Control::Rollback).await {
        diagnostics.report(Diagnostic::RollbackFailed {
            error: SqlError::classify(&err),
        });
    }
}

fn settle_committed(
    on_complete: Option<TransactionCompleteCallback>,
    diagnostics: &Diagnostics,
) -> TransactionState {
    tracing::debug!(state = ?TransactionState::Committed, "transaction settled");
    if let Some(callback) = on_complete
        && let Err(payload) = catch_unwind(AssertUnwindSafe(callback))
    {
        diagnostics.report(Diagnostic::CallbackPanicked {
            stage: CallbackStage::TransactionComplete,
            message: panic_message(payload.as_ref()),
        });
    }
    TransactionState::Committed
}

fn settle_rolled_back(
    error: SqlError,
    read_only: bool,
    on_error: Option<TransactionErrorCallback>,
    diagnostics: &Diagnostics,
) -> TransactionState {
    tracing::debug!(state = ?TransactionState::RolledBack, %error, "transaction settled");
    match on_error {
        Some(callback) => {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(error))) {
                diagnostics.report(Diagnostic::CallbackPanicked {
                    stage: CallbackStage::TransactionError,
                    message: panic_message(payload.as_ref()),
                });
            }
        }
        None => diagnostics.report(Diagnostic::SwallowedError { read_only, error }),
    }
    TransactionState::RolledBack
}
