//! dalkit core: record model, mapping and statement synthesis
//!
//! This crate holds everything in the data-access layer that does not touch a
//! connection:
//!
//! - the structured error facility ([`errors`])
//! - the logging facility ([`logging_facility`])
//! - the value and record model ([`model`]) with coercion rules ([`convert`])
//! - binding tables and the row mapper ([`mapper`])
//! - SQL statement synthesis ([`sql`])
//!
//! Connections, sessions and repositories live in `dalkit-store`.

#![allow(clippy::result_large_err)]

pub mod convert;
pub mod errors;
pub mod logging_facility;
pub mod mapper;
pub mod model;
pub mod sql;

pub use convert::{ColumnKind, ConvertError, FieldValue, NamedEnum};
pub use errors::{DalError, DalErrorKind, Result};
pub use mapper::{
    escape_like, map_parameter, map_row, mapper_for, FieldBinding, FieldTable, FieldTableBuilder,
    Mapper,
};
pub use model::{Record, RecordMeta, Row, TableBinding, Value};
pub use sql::Statement;
