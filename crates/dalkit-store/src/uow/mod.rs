//! Unit of Work: sessions, commands and the session factory

mod command;
mod factory;
mod session;

pub use command::{Command, RowCursor};
pub use factory::UnitOfWorkFactory;
pub use session::{ConnectionHandle, UnitOfWork};
