//! Database connection management
//!
//! Provides utilities for opening and configuring SQLite connections

use std::path::Path;
use std::time::Duration;

use dalkit_core::errors::DalErrorKind;
use rusqlite::Connection;
use tracing::debug;

use crate::config::ConnectionSettings;
use crate::errors::{connection_error, from_rusqlite, Result};

/// Target string that selects a private in-memory database
pub const IN_MEMORY: &str = ":memory:";

const JOURNAL_MODES: &[&str] = &["DELETE", "TRUNCATE", "PERSIST", "MEMORY", "WAL", "OFF"];

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    Connection::open(path).map_err(|e| connection_error(&path.display().to_string(), e))
}

/// Open an in-memory SQLite database
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(|e| connection_error(IN_MEMORY, e))
}

/// Open `:memory:`, a file path, or a `file:` URI
pub fn open_target(target: &str) -> Result<Connection> {
    if target == IN_MEMORY {
        open_in_memory()
    } else {
        open(target)
    }
}

/// Open and configure a connection from its settings
pub fn connect(settings: &ConnectionSettings) -> Result<Connection> {
    let conn = open_target(&settings.path)?;
    configure(&conn, settings)?;
    debug!(path = %settings.path, schema = %settings.schema, "connection opened");
    Ok(conn)
}

/// Apply connection pragmas from settings
pub fn configure(conn: &Connection, settings: &ConnectionSettings) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", settings.foreign_keys)
        .map_err(from_rusqlite(DalErrorKind::Connection, "configure"))?;

    if let Some(timeout_ms) = settings.busy_timeout_ms {
        conn.busy_timeout(Duration::from_millis(timeout_ms))
            .map_err(from_rusqlite(DalErrorKind::Connection, "configure"))?;
    }

    if let Some(mode) = &settings.journal_mode {
        let mode = normalize_journal_mode(mode)?;
        // journal_mode answers with the mode actually in effect
        let applied: String = conn
            .pragma_update_and_check(None, "journal_mode", mode, |row| row.get(0))
            .map_err(from_rusqlite(DalErrorKind::Connection, "configure"))?;
        debug!(requested = mode, applied = %applied, "journal mode set");
    }

    Ok(())
}

/// Validate a journal mode name, returning its canonical spelling
pub fn normalize_journal_mode(mode: &str) -> Result<&'static str> {
    JOURNAL_MODES
        .iter()
        .find(|m| m.eq_ignore_ascii_case(mode.trim()))
        .copied()
        .ok_or_else(|| {
            crate::errors::configuration(format!("unknown journal mode '{}'", mode))
        })
}
