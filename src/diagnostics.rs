//! Side channel for failures the legacy contract deliberately hides.
//!
//! An unhandled transaction error is swallowed and a panicking lifecycle callback is
//! never re-raised. Both still reach `tracing` and, when installed, the hook here;
//! the hook only observes and cannot change the outcome.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::error::SqlError;

/// Which user callback a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStage {
    Builder,
    StatementSuccess,
    StatementError,
    TransactionError,
    TransactionComplete,
    Ready,
}

impl fmt::Display for CallbackStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallbackStage::Builder => "transaction builder",
            CallbackStage::StatementSuccess => "statement success callback",
            CallbackStage::StatementError => "statement error callback",
            CallbackStage::TransactionError => "transaction error callback",
            CallbackStage::TransactionComplete => "transaction complete callback",
            CallbackStage::Ready => "database ready callback",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A transaction rolled back and no error callback was registered.
    SwallowedError { read_only: bool, error: SqlError },
    /// A callback panicked where the failure is not reported to the caller.
    CallbackPanicked { stage: CallbackStage, message: String },
    /// The engine refused to roll back a failed transaction.
    RollbackFailed { error: SqlError },
}

pub type DiagnosticHook = Arc<dyn Fn(&Diagnostic) + Send + Sync>;

#[derive(Clone, Default)]
pub(crate) struct Diagnostics {
    hook: Option<DiagnosticHook>,
}

impl Diagnostics {
    pub(crate) fn new(hook: Option<DiagnosticHook>) -> Self {
        Self { hook }
    }

    pub(crate) fn is_installed(&self) -> bool {
        self.hook.is_some()
    }

    pub(crate) fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::SwallowedError { read_only, error } => {
                tracing::warn!(read_only, %error, "transaction error swallowed (no error callback)");
            }
            Diagnostic::CallbackPanicked { stage, message } => {
                tracing::warn!(%stage, %message, "callback panicked");
            }
            Diagnostic::RollbackFailed { error } => {
                tracing::warn!(%error, "rollback failed");
            }
        }
        if let Some(hook) = &self.hook
            && catch_unwind(AssertUnwindSafe(|| hook(&diagnostic))).is_err()
        {
            tracing::warn!("diagnostic hook panicked");
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("hook", &self.hook.as_ref().map(|_| "<fn>"))
            .finish()
    }
}
