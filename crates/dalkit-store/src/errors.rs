//! Error handling for dalkit-store
//!
//! Wraps the dalkit-core `DalError` with store-specific helpers

use dalkit_core::errors::{DalError, DalErrorKind};

pub use dalkit_core::errors::Result;

/// Wrap a rusqlite error under the kind of the failing operation
///
/// Returns a closure for use with `map_err`.
pub fn from_rusqlite(kind: DalErrorKind, op: &'static str) -> impl FnOnce(rusqlite::Error) -> DalError {
    move |err| {
        DalError::new(kind)
            .with_op(op)
            .with_message(err.to_string())
            .with_source(err)
    }
}

/// Create a connection error for the given target
pub fn connection_error(target: &str, err: rusqlite::Error) -> DalError {
    DalError::new(DalErrorKind::Connection)
        .with_op("open_connection")
        .with_message(format!("cannot open '{}': {}", target, err))
        .with_source(err)
}

/// Create a transaction state error
pub fn transaction_state(op: &str, reason: &str) -> DalError {
    DalError::new(DalErrorKind::TransactionState)
        .with_op(op.to_string())
        .with_message(reason.to_string())
}

/// Create a configuration error
pub fn configuration(reason: impl Into<String>) -> DalError {
    DalError::new(DalErrorKind::Configuration)
        .with_op("configuration")
        .with_message(reason)
}
