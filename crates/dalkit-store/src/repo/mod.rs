//! Repository layer
//!
//! - `Repository<T>`: entity-shaped SQL for one record type
//! - `RepositoryQuery<T>`: fluent filter/order/include/page composition

mod query;
mod repository;

pub use query::{check_paging, page_slice, Page, QuerySpec, RepositoryQuery};
pub use repository::{Records, Repository};
