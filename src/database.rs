use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;

use crate::config::{DatabaseOptions, ReadyCallback};
use crate::diagnostics::{CallbackStage, Diagnostic, Diagnostics};
use crate::engine::SqlEngine;
use crate::error::{CallbackError, ErrorCode, SqlError, WebSqlError, panic_message};
use crate::scheduler::{self, TransactionCallbacks, TransactionRequest};
use crate::transaction::SqlTransaction;

enum Job {
    Transaction(TransactionRequest),
    /// Resolved once every job queued ahead of it has settled.
    Barrier(oneshot::Sender<()>),
}

/// Handle to one database connection and its transaction chain.
///
/// Transactions are queued on the chain and run strictly one after another: the next
/// one does not start until the previous one has committed or rolled back. A
/// transaction whose engine call never returns therefore blocks every transaction
/// queued behind it; there is no timeout.
///
/// Clones share the same connection and chain.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    chain: mpsc::UnboundedSender<Job>,
    options: DatabaseOptions,
}

impl Database {
    /// Open a `SQLite` database by file name (`:memory:` for a private in-memory one).
    ///
    /// # Errors
    /// Returns `WebSqlError` if the file cannot be opened or no tokio runtime is running.
    #[cfg(feature = "sqlite")]
    pub fn open(name: impl Into<String>) -> Result<Self, WebSqlError> {
        DatabaseOptions::builder(name).open()
    }

    /// Wrap an engine and start the chain driver on the current tokio runtime.
    ///
    /// # Errors
    /// Returns `WebSqlError::ConfigError` when called outside a tokio runtime.
    pub fn with_engine<E>(engine: E, options: DatabaseOptions) -> Result<Self, WebSqlError>
    where
        E: SqlEngine + 'static,
    {
        let handle = Handle::try_current().map_err(|err| {
            WebSqlError::ConfigError(format!("a tokio runtime is required to open a database: {err}"))
        })?;
        let (chain, receiver) = mpsc::unbounded_channel();
        let engine: Arc<dyn SqlEngine> = Arc::new(engine);
        handle.spawn(drive_chain(engine, receiver, options.diagnostics.clone()));
        tracing::debug!(name = %options.name, version = %options.version, "database opened");
        Ok(Self {
            inner: Arc::new(DatabaseInner { chain, options }),
        })
    }

    /// Queue a read-write transaction.
    ///
    /// `builder` runs later, on the chain, with a fresh transaction to queue statements
    /// on. The outcome is only reported through `callbacks`.
    pub fn transaction<B>(&self, builder: B, callbacks: TransactionCallbacks)
    where
        B: FnOnce(&mut SqlTransaction) -> Result<(), CallbackError> + Send + 'static,
    {
        self.enqueue(Box::new(builder), callbacks, false);
    }

    /// Queue a read-only transaction. Statements that could write are reported as
    /// read-only violations and never reach the engine.
    pub fn read_transaction<B>(&self, builder: B, callbacks: TransactionCallbacks)
    where
        B: FnOnce(&mut SqlTransaction) -> Result<(), CallbackError> + Send + 'static,
    {
        self.enqueue(Box::new(builder), callbacks, true);
    }

    /// Wait until every transaction queued before this call has settled.
    pub async fn flush(&self) {
        let (done, settled) = oneshot::channel();
        if self.inner.chain.send(Job::Barrier(done)).is_err() {
            return;
        }
        let _ = settled.await;
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.options.name
    }

    /// Version string given at open.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.inner.options.version
    }

    #[must_use]
    pub fn options(&self) -> &DatabaseOptions {
        &self.inner.options
    }

    fn enqueue(
        &self,
        builder: scheduler::TransactionBuilder,
        callbacks: TransactionCallbacks,
        read_only: bool,
    ) {
        let request = TransactionRequest {
            builder,
            callbacks,
            read_only,
        };
        if let Err(mpsc::error::SendError(job)) = self.inner.chain.send(Job::Transaction(request))
            && let Job::Transaction(request) = job
        {
            request.callbacks.fail(
                SqlError::new(ErrorCode::Database, "database connection is closed"),
                &self.inner.options.diagnostics,
            );
        }
    }

    pub(crate) fn run_ready_callback(&self, callback: ReadyCallback) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(self))) {
            self.inner.options.diagnostics.report(Diagnostic::CallbackPanicked {
                stage: CallbackStage::Ready,
                message: panic_message(payload.as_ref()),
            });
        }
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.inner.options.name)
            .field("version", &self.inner.options.version)
            .finish_non_exhaustive()
    }
}

async fn drive_chain(
    engine: Arc<dyn SqlEngine>,
    mut receiver: mpsc::UnboundedReceiver<Job>,
    diagnostics: Diagnostics,
) {
    let mut sequence: u64 = 0;
    while let Some(job) = receiver.recv().await {
        match job {
            Job::Transaction(request) => {
                sequence += 1;
                let span = tracing::debug_span!("transaction", sequence, read_only = request.read_only);
                let state = scheduler::run_transaction(engine.as_ref(), request, &diagnostics)
                    .instrument(span)
                    .await;
                tracing::trace!(sequence, ?state, "chain advanced");
            }
            Job::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!(transactions = sequence, "transaction chain closed");
}

/// Legacy `openDatabase`: `description` and `estimated_size` are accepted for
/// signature compatibility only.
///
/// # Errors
/// Returns `WebSqlError` if the database cannot be opened or no tokio runtime is running.
#[cfg(feature = "sqlite")]
pub fn open_database(
    name: impl Into<String>,
    version: impl Into<String>,
    description: impl Into<String>,
    estimated_size: u64,
) -> Result<Database, WebSqlError> {
    DatabaseOptions::builder(name)
        .version(version)
        .description(description)
        .estimated_size(estimated_size)
        .open()
}
