use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::DatabaseOptions;
use crate::error::WebSqlError;

pub(crate) type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// `SQLite` adapter for the engine primitive, owning one rusqlite connection.
///
/// Every call hops onto `spawn_blocking` and takes the connection lock there, so the
/// async side never blocks on `SQLite` I/O.
#[derive(Clone)]
pub struct SqliteEngine {
    name: String,
    conn: SharedSqliteConnection,
}

impl SqliteEngine {
    /// Open (or create) the database named in `options`.
    ///
    /// This is synchronous and returns as soon as the file handle exists.
    ///
    /// # Errors
    /// Returns `WebSqlError::SqliteError` if the file cannot be opened or the requested
    /// pragmas cannot be applied.
    pub fn open(options: &DatabaseOptions) -> Result<Self, WebSqlError> {
        let conn = rusqlite::Connection::open(&options.name)?;
        if let Some(timeout) = options.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        if options.journal_wal {
            apply_wal_pragmas(&conn)?;
        }
        tracing::debug!(name = %options.name, "opened sqlite connection");
        Ok(Self {
            name: options.name.clone(),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database with default options.
    ///
    /// # Errors
    /// Returns `WebSqlError::SqliteError` if `SQLite` cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, WebSqlError> {
        Self::open(&DatabaseOptions::new(":memory:"))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn conn_handle(&self) -> SharedSqliteConnection {
        Arc::clone(&self.conn)
    }
}

impl fmt::Debug for SqliteEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteEngine")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

pub(crate) async fn run_blocking<F, R>(conn: SharedSqliteConnection, func: F) -> Result<R, WebSqlError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, WebSqlError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| WebSqlError::EngineError(format!("sqlite spawn_blocking join error: {e}")))?
}

/// Switch the journal to WAL. `journal_mode` answers with a row, so read it back.
fn apply_wal_pragmas(conn: &rusqlite::Connection) -> Result<(), WebSqlError> {
    let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    tracing::debug!(%mode, "journal mode applied");
    Ok(())
}
