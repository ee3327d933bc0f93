mod result_set;
mod row;

pub use result_set::{ResultSet, RowList};
pub use row::{Columns, Row};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RunOutcome;
    use crate::types::SqlValue;

    fn sample_rows() -> Vec<Row> {
        let columns = Columns::new(vec!["id".into(), "name".into()]);
        vec![
            Row::new(
                columns.clone(),
                vec![SqlValue::Int(1), SqlValue::Text("alice".into())],
            ),
            Row::new(columns, vec![SqlValue::Int(2), SqlValue::Null]),
        ]
    }

    #[test]
    fn query_results_never_report_changes() {
        let rs = ResultSet::from_rows(sample_rows());
        assert_eq!(rs.rows_affected, 0);
        assert_eq!(rs.insert_id, None);
        assert_eq!(rs.rows.len(), 2);
        assert_eq!(
            rs.rows.item(0).and_then(|row| row.get("name")),
            Some(&SqlValue::Text("alice".into()))
        );
    }

    #[test]
    fn out_of_range_item_is_none() {
        let rs = ResultSet::from_rows(sample_rows());
        assert!(rs.rows.item(2).is_none());
        assert!(rs.rows.item(usize::MAX).is_none());
        assert!(ResultSet::default().rows.item(0).is_none());
    }

    #[test]
    fn mutation_drops_non_positive_ids() {
        let rs = ResultSet::from_run(RunOutcome {
            changes: 0,
            last_insert_rowid: Some(0),
        });
        assert_eq!(rs.insert_id, None);
        assert_eq!(rs.rows_affected, 0);

        let rs = ResultSet::from_run(RunOutcome {
            changes: 3,
            last_insert_rowid: Some(-4),
        });
        assert_eq!(rs.insert_id, None);
        assert_eq!(rs.rows_affected, 3);

        let rs = ResultSet::from_run(RunOutcome {
            changes: 1,
            last_insert_rowid: Some(42),
        });
        assert_eq!(rs.insert_id, Some(42));
        assert!(rs.rows.is_empty());
    }

    #[test]
    fn serializes_to_legacy_shape() -> Result<(), serde_json::Error> {
        let rs = ResultSet::from_rows(sample_rows());
        let json = serde_json::to_value(&rs)?;
        assert_eq!(
            json,
            serde_json::json!({
                "rowsAffected": 0,
                "rows": [
                    {"id": 1, "name": "alice"},
                    {"id": 2, "name": null}
                ]
            })
        );

        let rs = ResultSet::from_run(RunOutcome {
            changes: 1,
            last_insert_rowid: Some(7),
        });
        let json = serde_json::to_value(&rs)?;
        assert_eq!(json["insertId"], 7);
        assert_eq!(json["rowsAffected"], 1);
        Ok(())
    }
}
