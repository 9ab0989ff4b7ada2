//! Input normalization.
//!
//! Tables and single columns are turned into one ordered list of [`Record`]s
//! at the entry point, so rendering never has to look at the input's shape
//! again.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// One unit of input: a table row or a single column value
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Named fields, in column order
    Fields(Map<String, Value>),
    /// A bare value from a single-column input
    Scalar(Value),
}

/// In-memory tabular input
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Ordered rows with named columns
    Table(Vec<Map<String, Value>>),
    /// Ordered values of a single column
    Column(Vec<Value>),
}

impl Input {
    /// Interpret a JSON document as a table or a column.
    ///
    /// Accepted shapes:
    /// - array of objects: one row per object
    /// - array of scalars: a single column
    /// - object of equal-length arrays: columns keyed by name
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => Self::from_array(items),
            Value::Object(columns) => Self::from_columns(columns),
            other => Err(Error::InvalidInputShape(format!(
                "expected an array or an object of columns, got {}",
                kind_of(&other)
            ))),
        }
    }

    fn from_array(items: Vec<Value>) -> Result<Self> {
        let Some(first) = items.first() else {
            return Ok(Self::Table(Vec::new()));
        };

        if first.is_object() {
            let mut rows = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                match item {
                    Value::Object(row) => rows.push(row),
                    other => {
                        return Err(Error::InvalidInputShape(format!(
                            "row {} is {}, but row 0 is an object",
                            i,
                            kind_of(&other)
                        )));
                    }
                }
            }
            return Ok(Self::Table(rows));
        }

        if let Some((i, item)) = items.iter().enumerate().find(|(_, v)| !is_scalar(v)) {
            return Err(Error::InvalidInputShape(format!(
                "value {} is {}, but a single column holds only scalars",
                i,
                kind_of(item)
            )));
        }
        Ok(Self::Column(items))
    }

    fn from_columns(columns: Map<String, Value>) -> Result<Self> {
        let mut height = None;
        for (name, column) in &columns {
            let Value::Array(values) = column else {
                return Err(Error::InvalidInputShape(format!(
                    "column '{}' is {}, expected an array",
                    name,
                    kind_of(column)
                )));
            };
            match height {
                None => height = Some(values.len()),
                Some(h) if h != values.len() => {
                    return Err(Error::InvalidInputShape(format!(
                        "column '{}' has {} values, expected {}",
                        name,
                        values.len(),
                        h
                    )));
                }
                Some(_) => {}
            }
        }

        let mut rows = vec![Map::new(); height.unwrap_or(0)];
        for (name, column) in columns {
            if let Value::Array(values) = column {
                for (row, value) in rows.iter_mut().zip(values) {
                    row.insert(name.clone(), value);
                }
            }
        }
        Ok(Self::Table(rows))
    }

    /// Number of records
    pub fn len(&self) -> usize {
        match self {
            Self::Table(rows) => rows.len(),
            Self::Column(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalize into records, preserving input order
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Self::Table(rows) => rows.into_iter().map(Record::Fields).collect(),
            Self::Column(values) => values.into_iter().map(Record::Scalar).collect(),
        }
    }
}

/// Anything the batch processor accepts as input
pub trait IntoInput {
    fn into_input(self) -> Result<Input>;
}

impl IntoInput for Input {
    fn into_input(self) -> Result<Input> {
        Ok(self)
    }
}

impl IntoInput for Value {
    fn into_input(self) -> Result<Input> {
        Input::from_json(self)
    }
}

/// Text form of a value inside a prompt: strings unquoted, null as empty
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_of_objects_is_table() {
        let input = Input::from_json(json!([
            {"salary": 2, "emp_name": "shrajan"},
            {"salary": 3, "emp_name": "rinith"}
        ]))
        .unwrap();

        assert_eq!(input.len(), 2);
        let records = input.into_records();
        match &records[1] {
            Record::Fields(row) => {
                assert_eq!(row["salary"], json!(3));
                // Column order is preserved
                assert_eq!(row.keys().collect::<Vec<_>>(), vec!["salary", "emp_name"]);
            }
            other => panic!("expected fields, got {other:?}"),
        }
    }

    #[test]
    fn test_array_of_scalars_is_column() {
        let input = Input::from_json(json!([2, "three", null, true])).unwrap();
        assert_eq!(
            input.into_records(),
            vec![
                Record::Scalar(json!(2)),
                Record::Scalar(json!("three")),
                Record::Scalar(Value::Null),
                Record::Scalar(json!(true)),
            ]
        );
    }

    #[test]
    fn test_object_of_columns_is_table() {
        let input = Input::from_json(json!({
            "salary": [2, 3, 4],
            "emp_name": ["shrajan", "rinith", "pradeep"]
        }))
        .unwrap();

        let Input::Table(rows) = input else {
            panic!("expected table");
        };
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2]["salary"], json!(4));
        assert_eq!(rows[2]["emp_name"], json!("pradeep"));
    }

    #[test]
    fn test_empty_array() {
        let input = Input::from_json(json!([])).unwrap();
        assert!(input.is_empty());
        assert!(input.into_records().is_empty());
    }

    #[test]
    fn test_invalid_shapes() {
        let cases = [
            json!(42),
            json!("text"),
            json!(null),
            json!([{"a": 1}, 2]),
            json!([1, {"a": 1}]),
            json!([[1, 2], [3, 4]]),
            json!({"a": [1, 2], "b": [1]}),
            json!({"a": 1}),
        ];

        for case in cases {
            let result = Input::from_json(case.clone());
            assert!(
                matches!(result, Err(Error::InvalidInputShape(_))),
                "{case} should be rejected"
            );
        }
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("plain")), "plain");
        assert_eq!(display_value(&json!(2)), "2");
        assert_eq!(display_value(&json!(2.5)), "2.5");
        assert_eq!(display_value(&json!(false)), "false");
        assert_eq!(display_value(&Value::Null), "");
        assert_eq!(display_value(&json!([1, 2])), "[1,2]");
    }
}
