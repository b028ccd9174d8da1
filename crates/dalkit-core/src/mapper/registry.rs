//! Process-wide cache of one [`Mapper`] per record type

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use tracing::debug;

use super::Mapper;
use crate::errors::{DalError, DalErrorKind, Result};
use crate::model::Record;

type Slot = Arc<dyn Any + Send + Sync>;

static MAPPERS: OnceLock<RwLock<HashMap<TypeId, Slot>>> = OnceLock::new();

fn mappers() -> &'static RwLock<HashMap<TypeId, Slot>> {
    MAPPERS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Shared mapper for `T`, built on first use
///
/// # Errors
/// `Mapping` if the binding table of `T` is invalid. A failed build is not
/// cached, so the error repeats on every call.
pub fn mapper_for<T: Record>() -> Result<Arc<Mapper<T>>> {
    let key = TypeId::of::<T>();

    let cached = mappers()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(&key)
        .cloned();
    if let Some(slot) = cached {
        return downcast::<T>(slot);
    }

    let built: Slot = Arc::new(Mapper::<T>::new()?);
    let slot = {
        let mut guard = mappers()
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.entry(key).or_insert(built).clone()
    };
    debug!(entity = %super::entity_name::<T>(), "mapper registered");
    downcast::<T>(slot)
}

fn downcast<T: Record>(slot: Slot) -> Result<Arc<Mapper<T>>> {
    slot.downcast::<Mapper<T>>().map_err(|_| {
        DalError::new(DalErrorKind::Mapping)
            .with_op("mapper_for")
            .with_entity(super::entity_name::<T>())
            .with_message("registry slot holds a mapper of another type")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::FieldTable;
    use crate::model::RecordMeta;

    #[derive(Debug, Default)]
    struct Widget {
        meta: RecordMeta,
        label: String,
    }

    impl Record for Widget {
        fn fields() -> FieldTable<Self> {
            FieldTable::<Self>::builder()
                .meta(|w| &w.meta, |w| &mut w.meta)
                .field("Label", |w: &Widget| &w.label, |w: &mut Widget| &mut w.label)
                .build()
        }

        fn meta(&self) -> &RecordMeta {
            &self.meta
        }
    }

    #[derive(Debug, Default)]
    struct Clashing {
        meta: RecordMeta,
        a: i64,
    }

    impl Record for Clashing {
        fn fields() -> FieldTable<Self> {
            FieldTable::<Self>::builder()
                .meta(|c| &c.meta, |c| &mut c.meta)
                .field("ID", |c: &Clashing| &c.a, |c: &mut Clashing| &mut c.a)
                .build()
        }

        fn meta(&self) -> &RecordMeta {
            &self.meta
        }
    }

    #[test]
    fn test_same_mapper_returned_twice() {
        let first = mapper_for::<Widget>().unwrap();
        let second = mapper_for::<Widget>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.entity_name(), "Widget");
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let err = mapper_for::<Clashing>().unwrap_err();
        assert_eq!(err.kind(), DalErrorKind::Mapping);
        assert_eq!(err.column(), Some("ID"));
    }
}
