use crate::convert::{ColumnKind, ConvertError, FieldValue};
use crate::model::{RecordMeta, Value};

type Reader<T> = Box<dyn Fn(&T) -> Result<Value, ConvertError> + Send + Sync>;
type Writer<T> = Box<dyn Fn(&mut T, Value) -> Result<(), ConvertError> + Send + Sync>;

/// One named field of a record type with its typed accessors
pub struct FieldBinding<T> {
    name: String,
    kind: ColumnKind,
    nullable: bool,
    persisted: bool,
    read: Reader<T>,
    write: Option<Writer<T>>,
}

impl<T> FieldBinding<T> {
    /// Column name (dotted for nested fields)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_enum(&self) -> bool {
        self.kind == ColumnKind::Enum
    }

    pub fn is_writable(&self) -> bool {
        self.write.is_some()
    }

    /// Whether insert/update statements include this field
    ///
    /// Nested paths and computed fields are projection-only.
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn is_nested(&self) -> bool {
        self.name.contains('.')
    }

    /// Read the current value of this field
    ///
    /// # Errors
    /// [`ConvertError::NullIntermediate`] when a nested path crosses an unset
    /// object.
    pub fn read(&self, record: &T) -> Result<Value, ConvertError> {
        (self.read)(record)
    }

    /// Coerce `value` and store it; `Ok(false)` if the field is read-only
    ///
    /// # Errors
    /// Any coercion failure, or [`ConvertError::NullIntermediate`].
    pub fn write(&self, record: &mut T, value: Value) -> Result<bool, ConvertError> {
        match &self.write {
            Some(write) => write(record, value).map(|_| true),
            None => Ok(false),
        }
    }
}

impl<T> std::fmt::Debug for FieldBinding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBinding")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("nullable", &self.nullable)
            .field("persisted", &self.persisted)
            .field("writable", &self.write.is_some())
            .finish()
    }
}

/// Ordered binding table for a record type
///
/// Stands in for runtime reflection: each record type builds one through
/// [`FieldTable::builder`] and the mapper registry caches it.
pub struct FieldTable<T> {
    fields: Vec<FieldBinding<T>>,
}

impl<T: 'static> FieldTable<T> {
    pub fn builder() -> FieldTableBuilder<T> {
        FieldTableBuilder { fields: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FieldBinding<T>> {
        self.fields.get(index)
    }

    /// All bindings in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &FieldBinding<T>> {
        self.fields.iter()
    }

    /// Bindings written by insert and update, in declaration order
    pub fn persisted(&self) -> impl Iterator<Item = &FieldBinding<T>> {
        self.fields.iter().filter(|f| f.persisted)
    }
}

impl<T> std::fmt::Debug for FieldTable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.fields.iter()).finish()
    }
}

/// Builder for [`FieldTable`]
pub struct FieldTableBuilder<T> {
    fields: Vec<FieldBinding<T>>,
}

impl<T: 'static> FieldTableBuilder<T> {
    /// A persisted, writable field
    pub fn field<V, G, M>(mut self, name: &str, get: G, get_mut: M) -> Self
    where
        V: FieldValue + 'static,
        G: Fn(&T) -> &V + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut V + Send + Sync + 'static,
    {
        self.fields.push(FieldBinding {
            name: name.to_string(),
            kind: V::KIND,
            nullable: V::NULLABLE,
            persisted: true,
            read: Box::new(move |record: &T| -> Result<Value, ConvertError> {
                Ok(get(record).to_value())
            }),
            write: Some(Box::new(
                move |record: &mut T, value: Value| -> Result<(), ConvertError> {
                    *get_mut(record) = V::from_value(value)?;
                    Ok(())
                },
            )),
        });
        self
    }

    /// A computed, read-only field
    ///
    /// Visible to `map_parameter` but never persisted. A result column that
    /// matches it is a mapping error.
    pub fn read_only<V, G>(mut self, name: &str, get: G) -> Self
    where
        V: FieldValue + 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.fields.push(FieldBinding {
            name: name.to_string(),
            kind: V::KIND,
            nullable: V::NULLABLE,
            persisted: false,
            read: Box::new(move |record: &T| -> Result<Value, ConvertError> {
                Ok(get(record).to_value())
            }),
            write: None,
        });
        self
    }

    /// The `Id`, `DateCreated`, `DateUpdated` columns of an embedded [`RecordMeta`]
    pub fn meta(self, get: fn(&T) -> &RecordMeta, get_mut: fn(&mut T) -> &mut RecordMeta) -> Self {
        self.field(
            "Id",
            move |record: &T| &get(record).id,
            move |record: &mut T| &mut get_mut(record).id,
        )
        .field(
            "DateCreated",
            move |record: &T| &get(record).date_created,
            move |record: &mut T| &mut get_mut(record).date_created,
        )
        .field(
            "DateUpdated",
            move |record: &T| &get(record).date_updated,
            move |record: &mut T| &mut get_mut(record).date_updated,
        )
    }

    /// Project the fields of a nested object under `prefix.`
    ///
    /// The nested object must already exist for a row to be mapped into it;
    /// `None` from either accessor surfaces as
    /// [`ConvertError::NullIntermediate`]. Nested fields are never persisted.
    pub fn nested<N: 'static>(
        mut self,
        prefix: &str,
        get: fn(&T) -> Option<&N>,
        get_mut: fn(&mut T) -> Option<&mut N>,
        table: FieldTable<N>,
    ) -> Self {
        for inner in table.fields {
            let path = prefix.to_string();
            let read_path = path.clone();
            let inner_read = inner.read;
            let write = inner.write.map(|inner_write| -> Writer<T> {
                let write_path = path.clone();
                Box::new(move |record: &mut T, value: Value| -> Result<(), ConvertError> {
                    let nested = get_mut(record).ok_or_else(|| ConvertError::NullIntermediate {
                        path: write_path.clone(),
                    })?;
                    inner_write(nested, value)
                })
            });

            self.fields.push(FieldBinding {
                name: format!("{}.{}", prefix, inner.name),
                kind: inner.kind,
                nullable: inner.nullable,
                persisted: false,
                read: Box::new(move |record: &T| -> Result<Value, ConvertError> {
                    let nested = get(record).ok_or_else(|| ConvertError::NullIntermediate {
                        path: read_path.clone(),
                    })?;
                    inner_read(nested)
                }),
                write,
            });
        }
        self
    }

    pub fn build(self) -> FieldTable<T> {
        FieldTable {
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Address {
        city: String,
    }

    #[derive(Default)]
    struct Customer {
        meta: RecordMeta,
        name: String,
        address: Option<Address>,
    }

    fn address_table() -> FieldTable<Address> {
        FieldTable::<Address>::builder()
            .field("City", |a: &Address| &a.city, |a: &mut Address| &mut a.city)
            .build()
    }

    fn customer_table() -> FieldTable<Customer> {
        FieldTable::<Customer>::builder()
            .meta(|c| &c.meta, |c| &mut c.meta)
            .field("Name", |c: &Customer| &c.name, |c: &mut Customer| &mut c.name)
            .read_only("NameLength", |c: &Customer| c.name.len() as i64)
            .nested(
                "Address",
                |c| c.address.as_ref(),
                |c| c.address.as_mut(),
                address_table(),
            )
            .build()
    }

    #[test]
    fn test_declaration_order_and_flags() {
        let table = customer_table();
        let names: Vec<&str> = table.iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            vec!["Id", "DateCreated", "DateUpdated", "Name", "NameLength", "Address.City"]
        );

        let persisted: Vec<&str> = table.persisted().map(|f| f.name()).collect();
        assert_eq!(persisted, vec!["Id", "DateCreated", "DateUpdated", "Name"]);

        let updated = table.get(2).unwrap();
        assert!(updated.is_nullable());
        assert_eq!(updated.kind(), ColumnKind::Timestamp);

        let computed = table.get(4).unwrap();
        assert!(!computed.is_writable());
        assert!(table.get(5).unwrap().is_nested());
    }

    #[test]
    fn test_nested_write_requires_intermediate() {
        let table = customer_table();
        let city = table.get(5).unwrap();
        let mut customer = Customer::default();

        let err = city.write(&mut customer, Value::from("Oslo")).unwrap_err();
        assert_eq!(
            err,
            ConvertError::NullIntermediate {
                path: "Address".to_string()
            }
        );

        customer.address = Some(Address::default());
        assert_eq!(city.write(&mut customer, Value::from("Oslo")), Ok(true));
        assert_eq!(customer.address.as_ref().unwrap().city, "Oslo");
    }

    #[test]
    fn test_read_only_write_is_refused() {
        let table = customer_table();
        let mut customer = Customer::default();
        assert_eq!(
            table.get(4).unwrap().write(&mut customer, Value::Integer(3)),
            Ok(false)
        );
    }
}
