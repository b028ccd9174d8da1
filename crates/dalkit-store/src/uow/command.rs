//! Scoped commands and row cursors
//!
//! A [`Command`] is SQL text plus bound parameters tied to a session's
//! connection. Statements are prepared inside each call and released before
//! it returns, so no prepared statement or cursor outlives the call that
//! created it.

use std::sync::Arc;

use dalkit_core::errors::{DalError, DalErrorKind};
use dalkit_core::{FieldValue, Row, Statement, Value};
use dalkit_core_types::SessionId;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, ToSql};
use tracing::debug;

use crate::errors::{from_rusqlite, Result};

/// SQL text and parameters bound to one session's connection
pub struct Command<'s> {
    conn: &'s Connection,
    session_id: &'s SessionId,
    text: String,
    params: Vec<(String, Value)>,
}

impl<'s> Command<'s> {
    pub(crate) fn new(conn: &'s Connection, session_id: &'s SessionId, text: String) -> Self {
        Self {
            conn,
            session_id,
            text,
            params: Vec::new(),
        }
    }

    pub(crate) fn from_statement(
        conn: &'s Connection,
        session_id: &'s SessionId,
        statement: Statement,
    ) -> Self {
        let (text, params) = statement.into_parts();
        Self {
            conn,
            session_id,
            text,
            params,
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = text.into();
        self
    }

    /// Bind a named parameter, e.g. `@id`
    ///
    /// A name without the `@` prefix gets one. Re-binding replaces the value.
    pub fn bind(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        let name = if name.starts_with('@') {
            name.to_string()
        } else {
            format!("@{}", name)
        };
        let value = value.into();
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.params.push((name, value)),
        }
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parameters(&self) -> &[(String, Value)] {
        &self.params
    }

    /// Run a statement that returns no rows
    ///
    /// # Errors
    /// `QueryFailed` when the engine rejects the statement.
    pub fn execute(&self) -> Result<usize> {
        self.trace("execute");
        let mut stmt = self.prepare()?;
        let wrapped = self.wrapped();
        stmt.execute(as_params(&wrapped).as_slice())
            .map_err(from_rusqlite(DalErrorKind::QueryFailed, "execute"))
    }

    /// First column of the first row; `Null` when there is no row
    ///
    /// # Errors
    /// `QueryFailed` when the engine rejects the statement.
    pub fn query_scalar(&self) -> Result<Value> {
        self.query_rows(|cursor| match cursor.next() {
            Some(row) => Ok(row?.get_index(0).cloned().unwrap_or(Value::Null)),
            None => Ok(Value::Null),
        })
    }

    /// Scalar result read as a count
    ///
    /// # Errors
    /// `QueryFailed` when the statement fails or its result is not an integer.
    pub fn query_count(&self) -> Result<i64> {
        let value = self.query_scalar()?;
        if value.is_null() {
            return Ok(0);
        }
        i64::from_value(value).map_err(|e| {
            DalError::new(DalErrorKind::QueryFailed)
                .with_op("query_count")
                .with_message("count query did not return an integer")
                .with_source(e)
        })
    }

    /// Run a query and hand its rows to `f` as a single-pass cursor
    ///
    /// The prepared statement and cursor are dropped when this returns, on
    /// every path.
    ///
    /// # Errors
    /// `QueryFailed` when the statement cannot be prepared or run, plus
    /// whatever `f` returns.
    pub fn query_rows<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut RowCursor<'_>) -> Result<R>,
    {
        self.trace("query");
        let mut stmt = self.prepare()?;
        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
            .into();
        let wrapped = self.wrapped();
        let rows = stmt
            .query(as_params(&wrapped).as_slice())
            .map_err(from_rusqlite(DalErrorKind::QueryFailed, "query"))?;
        let mut cursor = RowCursor {
            rows,
            columns,
            done: false,
        };
        f(&mut cursor)
    }

    /// Every row of a query, materialised
    ///
    /// # Errors
    /// `QueryFailed` when the statement fails.
    pub fn query_all(&self) -> Result<Vec<Row>> {
        self.query_rows(|cursor| cursor.collect())
    }

    fn prepare(&self) -> Result<rusqlite::Statement<'s>> {
        self.conn
            .prepare(&self.text)
            .map_err(from_rusqlite(DalErrorKind::QueryFailed, "prepare"))
    }

    fn wrapped(&self) -> Vec<(&str, BoundValue<'_>)> {
        self.params
            .iter()
            .map(|(name, value)| (name.as_str(), BoundValue(value)))
            .collect()
    }

    fn trace(&self, kind: &str) {
        debug!(
            session_id = %self.session_id,
            kind,
            sql = %self.text,
            params = self.params.len(),
            "command"
        );
    }
}

/// Borrowing adapter that lets a [`Value`] bind as a rusqlite parameter
struct BoundValue<'a>(&'a Value);

fn as_params<'a>(wrapped: &'a [(&'a str, BoundValue<'a>)]) -> Vec<(&'a str, &'a dyn ToSql)> {
    wrapped
        .iter()
        .map(|(name, value)| (*name, value as &dyn ToSql))
        .collect()
}

impl ToSql for BoundValue<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self.0 {
            Value::Null => ValueRef::Null,
            Value::Integer(i) => ValueRef::Integer(*i),
            Value::Real(f) => ValueRef::Real(*f),
            Value::Text(s) => ValueRef::Text(s.as_bytes()),
            Value::Blob(b) => ValueRef::Blob(b),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

/// Single-pass cursor over the rows of one query
///
/// Yields `Err` once and then stops if the engine fails mid-iteration.
pub struct RowCursor<'stmt> {
    rows: rusqlite::Rows<'stmt>,
    columns: Arc<[String]>,
    done: bool,
}

impl RowCursor<'_> {
    /// Column names of the result set
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Iterator for RowCursor<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.rows.next() {
            Ok(Some(row)) => {
                let values: rusqlite::Result<Vec<Value>> = (0..self.columns.len())
                    .map(|i| row.get_ref(i).map(from_value_ref))
                    .collect();
                match values {
                    Ok(values) => Some(Ok(Row::new(self.columns.clone(), values))),
                    Err(e) => {
                        self.done = true;
                        Some(Err(from_rusqlite(DalErrorKind::QueryFailed, "read_row")(e)))
                    }
                }
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(from_rusqlite(DalErrorKind::QueryFailed, "read_row")(e)))
            }
        }
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => Value::Text(text.to_string()),
            Err(_) => Value::Blob(bytes.to_vec()),
        },
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}
