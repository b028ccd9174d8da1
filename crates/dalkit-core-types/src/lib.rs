//! Core types shared across dalkit facilities
//!
//! This crate provides foundational types used by the error, logging and
//! session layers:
//!
//! - **Correlation types**: SessionId, attached to every event a unit of work emits
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::SessionId;
