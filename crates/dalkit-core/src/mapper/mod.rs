//! Row ↔ record mapping
//!
//! A [`Mapper`] wraps a record type's [`FieldTable`] with a precomputed,
//! case-insensitive column index. Mappers are built once per type and shared
//! through the registry in [`registry`].

mod fields;
mod like;
pub mod registry;

use std::collections::HashMap;

use tracing::trace;

pub use fields::{FieldBinding, FieldTable, FieldTableBuilder};
pub use like::escape_like;
pub use registry::mapper_for;

use crate::convert::ConvertError;
use crate::errors::{DalError, DalErrorKind, Result};
use crate::model::{Record, Row, Value};

/// Binding table plus lowercase column-name index for one record type
pub struct Mapper<T> {
    entity: String,
    table: FieldTable<T>,
    index: HashMap<String, usize>,
}

impl<T: Record> Mapper<T> {
    /// Build the mapper for a record type from its declared fields
    ///
    /// # Errors
    /// `Mapping` if two fields resolve to the same column.
    pub fn new() -> Result<Self> {
        Self::from_table(entity_name::<T>(), T::fields())
    }
}

impl<T: Default + 'static> Mapper<T> {
    /// Build a mapper over an explicit binding table
    ///
    /// # Errors
    /// `Mapping` if two fields resolve to the same column.
    pub fn from_table(entity: impl Into<String>, table: FieldTable<T>) -> Result<Self> {
        let entity = entity.into();
        let mut index = HashMap::with_capacity(table.len());
        for (position, field) in table.iter().enumerate() {
            if index.insert(field.name().to_lowercase(), position).is_some() {
                return Err(DalError::new(DalErrorKind::Mapping)
                    .with_op("build_mapper")
                    .with_entity(entity.clone())
                    .with_column(field.name().to_string())
                    .with_message("two fields resolve to the same column"));
            }
        }
        Ok(Self {
            entity,
            table,
            index,
        })
    }

    /// Name of the mapped record type, used in error context
    pub fn entity_name(&self) -> &str {
        &self.entity
    }

    pub fn fields(&self) -> &FieldTable<T> {
        &self.table
    }

    /// Find the binding for a column (case-insensitive exact match)
    pub fn resolve(&self, column: &str) -> Option<&FieldBinding<T>> {
        self.index
            .get(&column.to_lowercase())
            .and_then(|&i| self.table.get(i))
    }

    /// Map a result row onto a fresh zero-valued record
    ///
    /// # Errors
    /// `Mapping` naming the column when it matches no field, matches a
    /// read-only field, or its value cannot be coerced.
    pub fn map_row(&self, row: &Row) -> Result<T> {
        let mut record = T::default();
        self.apply_row(&mut record, row)?;
        Ok(record)
    }

    /// Map a result row onto an existing record
    ///
    /// Null columns leave the current field value untouched.
    ///
    /// # Errors
    /// Same as [`Mapper::map_row`].
    pub fn apply_row(&self, record: &mut T, row: &Row) -> Result<()> {
        for (column, value) in row.iter() {
            let field = self.resolve(column).ok_or_else(|| {
                self.mapping_error("map_row", column)
                    .with_message("no field matches column")
            })?;

            if value.is_null() {
                trace!(entity = %self.entity, column, "null column skipped");
                continue;
            }

            let written = field
                .write(record, value.clone())
                .map_err(|e| self.convert_error("map_row", column, e))?;
            if !written {
                return Err(self
                    .mapping_error("map_row", column)
                    .with_message("field is read-only"));
            }
        }
        Ok(())
    }

    /// Current value of a field, ready to bind as a parameter
    ///
    /// # Errors
    /// `InvalidInput` for an unknown field name; `Mapping` when a nested path
    /// crosses an unset object.
    pub fn parameter_value(&self, record: &T, field_name: &str) -> Result<Value> {
        let field = self.resolve(field_name).ok_or_else(|| {
            DalError::new(DalErrorKind::InvalidInput)
                .with_op("map_parameter")
                .with_entity(self.entity.clone())
                .with_column(field_name.to_string())
                .with_message("no such field")
        })?;
        field
            .read(record)
            .map_err(|e| self.convert_error("map_parameter", field_name, e))
    }

    /// Current value of a field rendered as SQL literal text
    ///
    /// For diagnostics only; statements are executed with bound parameters.
    ///
    /// # Errors
    /// Same as [`Mapper::parameter_value`].
    pub fn map_parameter(&self, record: &T, field_name: &str) -> Result<String> {
        self.parameter_value(record, field_name)
            .map(|value| value.to_literal())
    }

    /// Values of every persisted field in declaration order
    ///
    /// # Errors
    /// `Mapping` if a field cannot be read.
    pub fn persisted_values(&self, record: &T) -> Result<Vec<(String, Value)>> {
        self.table
            .persisted()
            .map(|field| {
                field
                    .read(record)
                    .map(|value| (field.name().to_string(), value))
                    .map_err(|e| self.convert_error("persisted_values", field.name(), e))
            })
            .collect()
    }

    fn mapping_error(&self, op: &str, column: &str) -> DalError {
        DalError::new(DalErrorKind::Mapping)
            .with_op(op.to_string())
            .with_entity(self.entity.clone())
            .with_column(column.to_string())
    }

    fn convert_error(&self, op: &str, column: &str, err: ConvertError) -> DalError {
        self.mapping_error(op, column)
            .with_message("value conversion failed")
            .with_source(err)
    }
}

impl<T> std::fmt::Debug for Mapper<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("entity", &self.entity)
            .field("fields", &self.table)
            .finish()
    }
}

/// Unqualified type name used as entity context in errors and logs
pub fn entity_name<T: ?Sized>() -> String {
    crate::model::TableBinding::conventional::<T>()
        .name()
        .to_string()
}

/// Map a row through the cached mapper for `T`
///
/// # Errors
/// See [`Mapper::map_row`].
pub fn map_row<T: Record>(row: &Row) -> Result<T> {
    mapper_for::<T>()?.map_row(row)
}

/// Render a field of `record` as SQL literal text through the cached mapper
///
/// # Errors
/// See [`Mapper::map_parameter`].
pub fn map_parameter<T: Record>(record: &T, field_name: &str) -> Result<String> {
    mapper_for::<T>()?.map_parameter(record, field_name)
}
