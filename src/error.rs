use std::fmt;

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Boxed error type returned by user callbacks (builders, success callbacks).
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum WebSqlError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Engine error: {0}")]
    EngineError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Read-only violation: cannot execute `{0}` in a read-only transaction")]
    ReadOnlyViolation(String),

    #[error("Callback error: {0}")]
    CallbackError(String),

    #[error("Transaction builder failed: {0}")]
    BuilderError(String),

    #[error("Transaction already finished; no further statements may be queued")]
    TransactionFinished,

    #[error("Transaction control statement not allowed in a queued statement: `{0}`")]
    TransactionControl(String),

    /// The engine closed the enclosing transaction while running a statement.
    /// Statement error callbacks cannot suppress it.
    #[error("Transaction aborted by the engine: {0}")]
    TransactionAborted(String),
}

impl WebSqlError {
    pub(crate) fn from_callback(err: &CallbackError) -> Self {
        WebSqlError::CallbackError(err.to_string())
    }

    /// Whether the engine transaction this error came from is already gone.
    #[must_use]
    pub fn ends_transaction(&self) -> bool {
        matches!(self, WebSqlError::TransactionAborted(_))
    }

    pub(crate) fn from_panic(stage: &str, payload: &(dyn std::any::Any + Send)) -> Self {
        WebSqlError::CallbackError(format!("{stage} panicked: {}", panic_message(payload)))
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Legacy `SQLError` code numbering. Serializes as the bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    Unknown = 0,
    Database = 1,
    Version = 2,
    TooLarge = 3,
    Quota = 4,
    Syntax = 5,
    Constraint = 6,
    Timeout = 7,
}

impl ErrorCode {
    /// Numeric code as exposed by the legacy API.
    #[must_use]
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Best-effort mapping of engine error text to a legacy code.
    ///
    /// Patterns are tried in order and the first match wins, so the more specific
    /// families (constraint, size, quota) sit ahead of the generic database bucket.
    /// Text that matches nothing maps to [`ErrorCode::Unknown`]. The mapping is not
    /// guaranteed to agree with any historical browser implementation.
    #[must_use]
    pub fn classify(message: &str) -> ErrorCode {
        CLASSIFIER
            .iter()
            .find(|(pattern, _)| pattern.is_match(message))
            .map_or(ErrorCode::Unknown, |(_, code)| *code)
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.as_u16())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::Unknown => "UNKNOWN_ERR",
            ErrorCode::Database => "DATABASE_ERR",
            ErrorCode::Version => "VERSION_ERR",
            ErrorCode::TooLarge => "TOO_LARGE_ERR",
            ErrorCode::Quota => "QUOTA_ERR",
            ErrorCode::Syntax => "SYNTAX_ERR",
            ErrorCode::Constraint => "CONSTRAINT_ERR",
            ErrorCode::Timeout => "TIMEOUT_ERR",
        };
        f.write_str(name)
    }
}

fn pattern(source: &str) -> Regex {
    RegexBuilder::new(source)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|err| panic!("invalid classifier pattern {source:?}: {err}"))
}

lazy_static! {
    static ref CLASSIFIER: Vec<(Regex, ErrorCode)> = vec![
        (
            pattern(r"constraint failed|constraint violation|\bunique\b|foreign key|not null|check constraint"),
            ErrorCode::Constraint,
        ),
        (pattern(r"too big|too large|too many"), ErrorCode::TooLarge),
        (pattern(r"disk is full|\bquota\b|out of memory"), ErrorCode::Quota),
        (
            pattern(r"database is locked|database table is locked|\bbusy\b|timed? ?out|interrupted"),
            ErrorCode::Timeout,
        ),
        (pattern(r"version"), ErrorCode::Version),
        (
            pattern(r"syntax error|incomplete input|unrecognized token|no such (table|column|function)|not authorized|near "),
            ErrorCode::Syntax,
        ),
        (
            pattern(r"read-?only|malformed|not a database|unable to open|disk i/o|corrupt|no transaction is active|cannot (commit|rollback)|database"),
            ErrorCode::Database,
        ),
    ];
}

/// Legacy-shaped error handed to statement and transaction error callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlError {
    /// Legacy code
    pub code: ErrorCode,
    /// Human-readable message from the engine or the failing callback
    pub message: String,
}

impl SqlError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Classify an engine-level error into the legacy shape.
    #[must_use]
    pub fn classify(err: &WebSqlError) -> Self {
        let message = match err {
            #[cfg(feature = "sqlite")]
            WebSqlError::SqliteError(inner) => inner.to_string(),
            WebSqlError::EngineError(msg)
            | WebSqlError::ConnectionError(msg)
            | WebSqlError::ConfigError(msg)
            | WebSqlError::CallbackError(msg)
            | WebSqlError::BuilderError(msg) => msg.clone(),
            other => other.to_string(),
        };
        let code = match err {
            WebSqlError::ReadOnlyViolation(_) => ErrorCode::Database,
            WebSqlError::TransactionControl(_) => ErrorCode::Syntax,
            WebSqlError::TransactionAborted(cause) => match ErrorCode::classify(cause) {
                ErrorCode::Unknown => ErrorCode::Database,
                code => code,
            },
            WebSqlError::CallbackError(_) | WebSqlError::BuilderError(_) => ErrorCode::Unknown,
            _ => ErrorCode::classify(&message),
        };
        Self { code, message }
    }
}

impl fmt::Display for SqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.code.as_u16(), self.message)
    }
}

impl std::error::Error for SqlError {}

impl From<WebSqlError> for SqlError {
    fn from(err: WebSqlError) -> Self {
        SqlError::classify(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_sqlite_messages() {
        assert_eq!(
            ErrorCode::classify("near \"SELEKT\": syntax error"),
            ErrorCode::Syntax
        );
        assert_eq!(ErrorCode::classify("no such table: missing"), ErrorCode::Syntax);
        assert_eq!(
            ErrorCode::classify("UNIQUE constraint failed: t.id"),
            ErrorCode::Constraint
        );
        assert_eq!(
            ErrorCode::classify("NOT NULL constraint failed: t.x"),
            ErrorCode::Constraint
        );
        assert_eq!(ErrorCode::classify("database is locked"), ErrorCode::Timeout);
        assert_eq!(ErrorCode::classify("string or blob too big"), ErrorCode::TooLarge);
        assert_eq!(
            ErrorCode::classify("database or disk is full"),
            ErrorCode::Quota
        );
        assert_eq!(
            ErrorCode::classify("attempt to write a readonly database"),
            ErrorCode::Database
        );
        assert_eq!(ErrorCode::classify("version mismatch"), ErrorCode::Version);
    }

    #[test]
    fn unmatched_text_is_unknown() {
        assert_eq!(ErrorCode::classify("something odd happened"), ErrorCode::Unknown);
        assert_eq!(ErrorCode::classify(""), ErrorCode::Unknown);
    }

    #[test]
    fn read_only_violation_maps_to_database() {
        let err = SqlError::classify(&WebSqlError::ReadOnlyViolation("DROP TABLE t".into()));
        assert_eq!(err.code, ErrorCode::Database);
        assert!(err.message.contains("DROP TABLE t"));
    }

    #[test]
    fn aborted_transactions_keep_the_cause_code() {
        let err = WebSqlError::TransactionAborted("UNIQUE constraint failed: t.id".into());
        assert!(err.ends_transaction());
        assert_eq!(SqlError::classify(&err).code, ErrorCode::Constraint);

        let err = WebSqlError::TransactionAborted("the enclosing transaction was closed".into());
        assert_eq!(SqlError::classify(&err).code, ErrorCode::Database);

        let err = WebSqlError::TransactionControl("COMMIT".into());
        assert!(!err.ends_transaction());
        assert_eq!(SqlError::classify(&err).code, ErrorCode::Syntax);
        assert_eq!(ErrorCode::classify("not authorized"), ErrorCode::Syntax);
    }

    #[test]
    fn callback_failures_are_unknown_even_with_matching_text() {
        let err = SqlError::classify(&WebSqlError::CallbackError("syntax error in app".into()));
        assert_eq!(err.code, ErrorCode::Unknown);
        assert_eq!(err.message, "syntax error in app");
    }

    #[test]
    fn codes_keep_legacy_numbering() {
        assert_eq!(ErrorCode::Unknown.as_u16(), 0);
        assert_eq!(ErrorCode::Syntax.as_u16(), 5);
        assert_eq!(ErrorCode::Timeout.as_u16(), 7);
        assert_eq!(ErrorCode::Constraint.to_string(), "CONSTRAINT_ERR");
    }

    #[test]
    fn sql_error_serializes_with_numeric_code() -> Result<(), serde_json::Error> {
        let err = SqlError::new(ErrorCode::Syntax, "near \"FRM\": syntax error");
        assert_eq!(
            serde_json::to_value(&err)?,
            serde_json::json!({"code": 5, "message": "near \"FRM\": syntax error"})
        );
        Ok(())
    }
}
