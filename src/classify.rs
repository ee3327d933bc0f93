//! Syntactic statement classification.
//!
//! Only the leading keyword is inspected; statements are never split or parsed.
//! The keyword is the leading run of ASCII letters after whitespace and comments,
//! so it ends at the first non-letter rather than at whitespace: `SELECT*FROM t`
//! and `SELECT1` both lead with `SELECT`.

/// How a statement is executed against the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Rows are fetched (`SELECT`, `PRAGMA`, `EXPLAIN`, `WITH`).
    Query,
    /// Statement is applied and reports a change count.
    Mutation,
}

const QUERY_KEYWORDS: &[&str] = &["SELECT", "PRAGMA", "EXPLAIN", "WITH"];

/// Keywords that insert a row and can therefore produce a generated id.
const INSERT_KEYWORDS: &[&str] = &["INSERT", "REPLACE"];

/// Statements that open or close a transaction or savepoint.
const TRANSACTION_CONTROL_KEYWORDS: &[&str] =
    &["BEGIN", "COMMIT", "END", "ROLLBACK", "SAVEPOINT", "RELEASE"];

/// Pragmas whose call form, `PRAGMA name(arg)`, only reads. Any other pragma
/// given an argument is treated as a write.
const READ_PRAGMAS_WITH_ARGUMENT: &[&str] = &[
    "foreign_key_check",
    "foreign_key_list",
    "index_info",
    "index_list",
    "index_xinfo",
    "integrity_check",
    "quick_check",
    "table_info",
    "table_list",
    "table_xinfo",
];

/// Pragmas that change the database even without an argument.
const WRITING_PRAGMAS: &[&str] = &["incremental_vacuum", "optimize", "shrink_memory", "wal_checkpoint"];

fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// Byte offset of the first character that is neither whitespace nor part of a comment.
fn skip_trivia(bytes: &[u8]) -> usize {
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx].is_ascii_whitespace() {
            idx += 1;
        } else if is_line_comment_start(bytes, idx) {
            while idx < bytes.len() && bytes[idx] != b'\n' {
                idx += 1;
            }
        } else if is_block_comment_start(bytes, idx) {
            idx += 2;
            while idx < bytes.len() && !is_block_comment_end(bytes, idx) {
                idx += 1;
            }
            idx = (idx + 2).min(bytes.len());
        } else {
            break;
        }
    }
    idx
}

/// The leading keyword of `sql`, as written (not case-folded).
///
/// Returns `None` when the statement does not start with an identifier character.
#[must_use]
pub fn leading_keyword(sql: &str) -> Option<&str> {
    let bytes = sql.as_bytes();
    let start = skip_trivia(bytes);
    let len = bytes[start..]
        .iter()
        .take_while(|b| b.is_ascii_alphabetic())
        .count();
    if len == 0 {
        None
    } else {
        Some(&sql[start..start + len])
    }
}

fn leading_keyword_in(sql: &str, set: &[&str]) -> bool {
    leading_keyword(sql).is_some_and(|kw| set.iter().any(|k| k.eq_ignore_ascii_case(kw)))
}

/// Classify a statement by its leading keyword.
#[must_use]
pub fn classify(sql: &str) -> StatementKind {
    if leading_keyword_in(sql, QUERY_KEYWORDS) {
        StatementKind::Query
    } else {
        StatementKind::Mutation
    }
}

/// A pragma that changes state: `PRAGMA name = value`, the call form
/// `PRAGMA name(value)` for anything outside the read-only introspection pragmas,
/// or one of the pragmas that write without an argument.
///
/// An optional schema prefix (`main.user_version`) is ignored.
#[must_use]
pub fn is_pragma_write(sql: &str) -> bool {
    let Some(keyword) = leading_keyword(sql) else {
        return false;
    };
    if !keyword.eq_ignore_ascii_case("PRAGMA") {
        return false;
    }
    let bytes = sql.as_bytes();
    let mut offset = skip_trivia(bytes) + keyword.len();
    offset += skip_trivia(&bytes[offset..]);
    let name_len = bytes[offset..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_' || **b == b'.')
        .count();
    let qualified = &sql[offset..offset + name_len];
    let name = qualified.rsplit('.').next().unwrap_or(qualified);
    let rest = &sql[offset + name_len..];
    let rest = &rest[skip_trivia(rest.as_bytes())..];

    let in_set = |set: &[&str]| set.iter().any(|p| p.eq_ignore_ascii_case(name));
    match rest.as_bytes().first() {
        Some(b'=') => true,
        Some(b'(') => !in_set(READ_PRAGMAS_WITH_ARGUMENT),
        _ => in_set(WRITING_PRAGMAS),
    }
}

/// Whether a statement may run inside a read-only transaction.
///
/// Only queries are allowed, and a pragma write counts as a write.
#[must_use]
pub fn allowed_in_read_only(sql: &str) -> bool {
    classify(sql) == StatementKind::Query && !is_pragma_write(sql)
}

/// Whether the statement would open or close a transaction or savepoint.
///
/// Queued statements always run inside the transaction the scheduler opened, so
/// these are refused before they reach the engine.
#[must_use]
pub fn is_transaction_control(sql: &str) -> bool {
    leading_keyword_in(sql, TRANSACTION_CONTROL_KEYWORDS)
}

/// Whether the statement's leading keyword inserts rows.
#[must_use]
pub fn is_insert(sql: &str) -> bool {
    leading_keyword_in(sql, INSERT_KEYWORDS)
}
