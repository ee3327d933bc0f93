//! Convenient imports for common functionality.

pub use crate::config::{DatabaseOptions, DatabaseOptionsBuilder};
pub use crate::database::Database;
pub use crate::diagnostics::{CallbackStage, Diagnostic};
pub use crate::engine::{Control, RunOutcome, SqlEngine};
pub use crate::error::{CallbackError, ErrorCode, SqlError, WebSqlError};
pub use crate::results::{ResultSet, Row, RowList};
pub use crate::scheduler::{TransactionCallbacks, TransactionState};
pub use crate::transaction::{SqlTransaction, StatementCallbacks};
pub use crate::types::SqlValue;

#[cfg(feature = "sqlite")]
pub use crate::database::open_database;
#[cfg(feature = "sqlite")]
pub use crate::sqlite::SqliteEngine;
