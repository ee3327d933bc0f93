use crate::error::WebSqlError;
use crate::results::Row;
use crate::types::SqlValue;

use super::guard::run_guarded;
use super::{SqliteEngine, run_blocking};
use crate::sqlite::params::Params;
use crate::sqlite::query::build_rows;

impl SqliteEngine {
    /// Run a query and materialize all rows.
    ///
    /// # Errors
    /// Returns `WebSqlError` if preparing or stepping the query fails.
    pub async fn select(&self, query: &str, params: &[SqlValue]) -> Result<Vec<Row>, WebSqlError> {
        let sql_owned = query.to_owned();
        let params = Params::convert(params);
        run_blocking(self.conn_handle(), move |guard| {
            run_guarded(guard, |conn| {
                let mut stmt = conn.prepare_cached(&sql_owned)?;
                build_rows(&mut stmt, &params)
            })
        })
        .await
    }
}
