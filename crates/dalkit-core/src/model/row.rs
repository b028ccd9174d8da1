use std::sync::Arc;

use super::value::Value;

static NULL: Value = Value::Null;

/// One result row: column names shared by the whole result set, plus values
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row over a shared column list
    ///
    /// `values` must be in column order; missing trailing values read as `Null`.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert!(values.len() <= columns.len());
        Self { columns, values }
    }

    /// Build a standalone row from (column, value) pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) =
            pairs.into_iter().map(|(c, v)| (c.into(), v)).unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Value at a column position
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        if index >= self.columns.len() {
            return None;
        }
        Some(self.values.get(index).unwrap_or(&NULL))
    }

    /// Value of a column by case-insensitive name
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|i| self.get_index(i))
    }

    /// Iterate (column, value) pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .enumerate()
            .map(move |(i, c)| (c.as_str(), self.values.get(i).unwrap_or(&NULL)))
    }
}
