use rusqlite::Statement;
use rusqlite::types::Value;

use crate::error::WebSqlError;
use crate::results::{Columns, Row};

use super::params::{Params, sqlite_value_to_sql_value};

/// Step a prepared query to completion and collect every row.
///
/// Column names are captured once and shared by all rows.
///
/// # Errors
/// Returns `WebSqlError::SqliteError` if binding, stepping or reading a column fails.
pub fn build_rows(stmt: &mut Statement<'_>, params: &Params) -> Result<Vec<Row>, WebSqlError> {
    let columns = Columns::new(
        stmt.column_names()
            .iter()
            .map(std::string::ToString::to_string)
            .collect(),
    );
    let col_count = columns.len();

    let mut rows_iter = stmt.query(&params.as_refs()[..])?;
    let mut rows = Vec::new();
    while let Some(row) = rows_iter.next()? {
        let mut values = Vec::with_capacity(col_count);
        for idx in 0..col_count {
            let value: Value = row.get(idx)?;
            values.push(sqlite_value_to_sql_value(value));
        }
        rows.push(Row::new(columns.clone(), values));
    }
    Ok(rows)
}
