//! Structured events emitted by dalkit
//!
//! Every public repository and unit-of-work operation is bracketed by a
//! `start` event and exactly one of `end` or `end_error`, each carrying `op`
//! and the owning `session_id`. Failures add `err_kind` and `err_code`.
//! The mapper, statement builder and commands only emit `debug!`/`trace!`
//! detail below those boundaries.
//!
//! Applications pick a rendering with [`init`]; tests record events in memory
//! with [`init_test_capture`].

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
