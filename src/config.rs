use std::sync::Arc;
use std::time::Duration;

use crate::database::Database;
use crate::diagnostics::{Diagnostic, DiagnosticHook, Diagnostics};
use crate::engine::SqlEngine;
use crate::error::WebSqlError;

/// Callback invoked once with the freshly opened handle.
pub type ReadyCallback = Box<dyn FnOnce(&Database) + Send>;

/// Options for opening a database.
///
/// `version`, `description` and `estimated_size` mirror the legacy `openDatabase`
/// signature. Only `version` is kept (see [`Database::version`]); the other two are
/// accepted and ignored.
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub name: String,
    pub version: String,
    pub description: String,
    pub estimated_size: u64,
    /// `SQLite` busy timeout applied at open
    pub busy_timeout: Option<Duration>,
    /// Switch the journal to WAL at open
    pub journal_wal: bool,
    pub(crate) diagnostics: Diagnostics,
}

impl DatabaseOptions {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: String::new(),
            description: String::new(),
            estimated_size: 0,
            busy_timeout: None,
            journal_wal: false,
            diagnostics: Diagnostics::default(),
        }
    }

    #[must_use]
    pub fn builder(name: impl Into<String>) -> DatabaseOptionsBuilder {
        DatabaseOptionsBuilder::new(name)
    }

    #[must_use]
    pub fn has_diagnostics_hook(&self) -> bool {
        self.diagnostics.is_installed()
    }
}

/// Fluent builder for [`DatabaseOptions`].
pub struct DatabaseOptionsBuilder {
    opts: DatabaseOptions,
    on_ready: Option<ReadyCallback>,
}

impl DatabaseOptionsBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            opts: DatabaseOptions::new(name),
            on_ready: None,
        }
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.opts.version = version.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.opts.description = description.into();
        self
    }

    #[must_use]
    pub fn estimated_size(mut self, size: u64) -> Self {
        self.opts.estimated_size = size;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn journal_wal(mut self, enabled: bool) -> Self {
        self.opts.journal_wal = enabled;
        self
    }

    /// Observe swallowed errors and panicking callbacks.
    #[must_use]
    pub fn diagnostics<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Diagnostic) + Send + Sync + 'static,
    {
        let hook: DiagnosticHook = Arc::new(hook);
        self.opts.diagnostics = Diagnostics::new(Some(hook));
        self
    }

    /// Run `callback` with the handle right after it opens.
    #[must_use]
    pub fn on_ready<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&Database) + Send + 'static,
    {
        self.on_ready = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn finish(self) -> DatabaseOptions {
        self.opts
    }

    /// Open the database through the `SQLite` adapter.
    ///
    /// # Errors
    /// Returns `WebSqlError` if the file cannot be opened or no tokio runtime is running.
    #[cfg(feature = "sqlite")]
    pub fn open(self) -> Result<Database, WebSqlError> {
        let engine = crate::sqlite::SqliteEngine::open(&self.opts)?;
        self.open_with_engine(engine)
    }

    /// Open the database on a caller-supplied engine.
    ///
    /// # Errors
    /// Returns `WebSqlError::ConfigError` if no tokio runtime is running.
    pub fn open_with_engine<E>(self, engine: E) -> Result<Database, WebSqlError>
    where
        E: SqlEngine + 'static,
    {
        let db = Database::with_engine(engine, self.opts)?;
        if let Some(callback) = self.on_ready {
            db.run_ready_callback(callback);
        }
        Ok(db)
    }
}
