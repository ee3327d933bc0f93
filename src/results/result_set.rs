use serde::Serialize;

use crate::engine::RunOutcome;

use super::row::Row;

/// Ordered, read-only view over the rows a query returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RowList {
    rows: Vec<Row>,
}

impl RowList {
    #[must_use]
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Row at `index`, or `None` when the index is out of range.
    #[must_use]
    pub fn item(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }
}

impl<'a> IntoIterator for &'a RowList {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Legacy-shaped statement result handed to success callbacks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSet {
    /// Generated row id of a mutation, when one was produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert_id: Option<i64>,
    /// Rows changed by a mutation; always 0 for queries
    pub rows_affected: u64,
    /// Rows returned by a query; empty for mutations
    pub rows: RowList,
}

impl ResultSet {
    /// Shape the rows of a query. Queries never report changes or an insert id.
    #[must_use]
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            insert_id: None,
            rows_affected: 0,
            rows: RowList::new(rows),
        }
    }

    /// Shape the outcome of a mutation. Non-positive ids are treated as absent.
    #[must_use]
    pub fn from_run(outcome: RunOutcome) -> Self {
        Self {
            insert_id: outcome.last_insert_rowid.filter(|id| *id > 0),
            rows_affected: outcome.changes,
            rows: RowList::default(),
        }
    }
}
