//! dalkit store: SQLite-backed sessions and repositories
//!
//! Provides:
//! - Connection opening and configuration (`db`, `config`)
//! - Unit of Work sessions with scoped commands (`uow`)
//! - Generic `Repository<T>` and its fluent query builder (`repo`)

#![allow(clippy::result_large_err)]

pub mod config;
pub mod db;
pub mod errors;
pub mod repo;
pub mod uow;

// Re-export key types
pub use config::{ConnectionSettings, DalConfig, TransactionPolicy};
pub use errors::Result;
pub use repo::{Page, QuerySpec, Repository, RepositoryQuery};
pub use uow::{Command, RowCursor, UnitOfWork, UnitOfWorkFactory};
