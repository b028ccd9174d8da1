//! Data model shared by the mapper, the statement builder and the store
//!
//! - `Value` / `Row`: what the engine hands back and what gets bound
//! - `Record` / `RecordMeta`: what a persisted type must provide
//! - `TableBinding`: convention-based table naming

pub mod record;
pub mod row;
pub mod table;
pub mod value;

pub use record::{Record, RecordMeta};
pub use row::Row;
pub use table::{TableBinding, DEFAULT_SCHEMA};
pub use value::Value;
