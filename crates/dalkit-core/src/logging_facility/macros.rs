//! Boundary macros for public operations
//!
//! Each macro stamps `component`, `op` and `event`. Extra `key = value`
//! fields after the required arguments go straight to `tracing`, so `%` and
//! `?` sigils work as usual. Paths resolve through `$crate`, so callers only
//! need `dalkit-core` in scope.

/// `start` marker, emitted before a repository or session operation runs
///
/// ```
/// # use dalkit_core::log_op_start;
/// log_op_start!("get_by_id");
/// log_op_start!("get_by_id", entity = "Customer", session_id = "s-1");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)+)?) => {
        $crate::logging_facility::macros::__support::tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::logging_facility::macros::__support::EVENT_START
            $(, $($field)+)?
        )
    };
}

/// `end` marker with the elapsed milliseconds
///
/// ```
/// # use dalkit_core::log_op_end;
/// log_op_end!("commit", duration_ms = 3, session_id = "s-1");
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)+)?) => {
        $crate::logging_facility::macros::__support::tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::logging_facility::macros::__support::EVENT_END,
            duration_ms = $duration
            $(, $($field)+)?
        )
    };
}

/// `end_error` marker; anything convertible into [`DalError`](crate::DalError)
/// is accepted and reported by kind, stable code and rendered message
///
/// ```
/// # use dalkit_core::log_op_error;
/// # use dalkit_core::errors::{DalError, DalErrorKind};
/// let err = DalError::new(DalErrorKind::UpdateFailed).with_entity("Customer");
/// log_op_error!("update", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)+)?) => {{
        let failure: $crate::errors::DalError = $err.into();
        $crate::logging_facility::macros::__support::tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::logging_facility::macros::__support::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?failure.kind(),
            err_code = failure.code(),
            err_message = %failure
            $(, $($field)+)?
        )
    }};
}

#[doc(hidden)]
pub mod __support {
    pub use dalkit_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
    pub use tracing;
}
