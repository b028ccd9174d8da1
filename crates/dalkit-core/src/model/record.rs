use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::table::TableBinding;
use crate::mapper::FieldTable;

/// A type the data-access layer can persist
///
/// Implementors provide a binding table describing their fields and embed a
/// [`RecordMeta`] carrying the identifier and timestamps. `Default` supplies
/// the zero-valued instance that result rows are mapped onto.
///
/// ```ignore
/// #[derive(Debug, Clone, Default, PartialEq)]
/// struct Product {
///     meta: RecordMeta,
///     name: String,
/// }
///
/// impl Record for Product {
///     fn fields() -> FieldTable<Self> {
///         FieldTable::<Self>::builder()
///             .meta(|p| &p.meta, |p| &mut p.meta)
///             .field("Name", |p: &Product| &p.name, |p: &mut Product| &mut p.name)
///             .build()
///     }
///
///     fn meta(&self) -> &RecordMeta {
///         &self.meta
///     }
/// }
/// ```
pub trait Record: Default + Send + Sync + 'static {
    /// Binding table for this type; built once and cached by the mapper registry
    fn fields() -> FieldTable<Self>;

    fn meta(&self) -> &RecordMeta;

    /// Table binding; defaults to the type-name convention
    fn table() -> TableBinding {
        TableBinding::conventional::<Self>()
    }

    fn id(&self) -> Uuid {
        self.meta().id
    }

    fn date_created(&self) -> DateTime<Utc> {
        self.meta().date_created
    }

    fn date_updated(&self) -> Option<DateTime<Utc>> {
        self.meta().date_updated
    }
}

/// Identifier and timestamps shared by every record
///
/// Registered by [`FieldTableBuilder::meta`](crate::mapper::FieldTableBuilder::meta)
/// as the columns `Id`, `DateCreated`, `DateUpdated`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordMeta {
    pub id: Uuid,
    pub date_created: DateTime<Utc>,
    pub date_updated: Option<DateTime<Utc>>,
}

impl RecordMeta {
    /// Fresh identity: new UUID v7, created now, never updated
    pub fn new() -> Self {
        Self {
            id: Uuid::now_v7(),
            date_created: Utc::now(),
            date_updated: None,
        }
    }

    /// Fresh identity with a caller-chosen id
    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            ..Self::new()
        }
    }

    /// Stamp `date_updated` with the current time
    pub fn touch(&mut self) {
        self.date_updated = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_meta_has_identity() {
        let meta = RecordMeta::new();
        assert!(!meta.id.is_nil());
        assert!(meta.date_updated.is_none());
    }

    #[test]
    fn test_default_meta_is_zero_valued() {
        let meta = RecordMeta::default();
        assert!(meta.id.is_nil());
        assert_eq!(meta.date_created.timestamp(), 0);
    }

    #[test]
    fn test_touch_sets_date_updated() {
        let mut meta = RecordMeta::with_id(Uuid::nil());
        meta.touch();
        assert!(meta.date_updated.is_some());
        assert!(meta.id.is_nil());
    }
}
