use rusqlite::types::Value;

use crate::types::SqlValue;

/// Convert a single `SqlValue` to a rusqlite `Value`.
#[must_use]
pub fn sql_value_to_sqlite_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Int(i) => Value::Integer(*i),
        SqlValue::Float(f) => Value::Real(*f),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Bool(b) => Value::Integer(i64::from(*b)),
        SqlValue::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        SqlValue::Null => Value::Null,
        SqlValue::JSON(jval) => Value::Text(jval.to_string()),
        SqlValue::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

/// Convert a rusqlite `Value` read from a row back into a `SqlValue`.
#[must_use]
pub fn sqlite_value_to_sql_value(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Int(i),
        Value::Real(f) => SqlValue::Float(f),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Blob(b),
    }
}

/// Owned `SQLite` parameter list, ready to move onto a blocking thread.
#[derive(Debug, Clone, Default)]
pub struct Params(pub Vec<Value>);

impl Params {
    #[must_use]
    pub fn convert(params: &[SqlValue]) -> Self {
        Params(params.iter().map(sql_value_to_sqlite_value).collect())
    }

    /// Build a borrowed params slice suitable for rusqlite execution.
    #[must_use]
    pub fn as_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.0.iter().map(|v| v as &dyn rusqlite::ToSql).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn converts_every_variant() {
        let ts = NaiveDate::from_ymd_opt(2024, 5, 6)
            .and_then(|d| d.and_hms_opt(7, 8, 9))
            .expect("valid timestamp");
        let params = Params::convert(&[
            SqlValue::Int(1),
            SqlValue::Float(1.5),
            SqlValue::Text("a".into()),
            SqlValue::Bool(true),
            SqlValue::Timestamp(ts),
            SqlValue::Null,
            SqlValue::JSON(serde_json::json!({"k": 1})),
            SqlValue::Blob(vec![1, 2]),
        ]);
        assert_eq!(
            params.0,
            vec![
                Value::Integer(1),
                Value::Real(1.5),
                Value::Text("a".into()),
                Value::Integer(1),
                Value::Text("2024-05-06 07:08:09".into()),
                Value::Null,
                Value::Text("{\"k\":1}".into()),
                Value::Blob(vec![1, 2]),
            ]
        );
        assert_eq!(params.as_refs().len(), 8);
    }
}
