use std::cell::Cell;
use std::ops::Deref;
use std::time::Instant;

use dalkit_core::errors::DalErrorKind;
use dalkit_core::model::DEFAULT_SCHEMA;
use dalkit_core::{log_op_end, log_op_error, log_op_start, Record, Statement};
use dalkit_core_types::SessionId;
use rusqlite::Connection;
use tracing::{debug, warn};

use super::command::Command;
use crate::config::{ConnectionSettings, TransactionPolicy};
use crate::errors::{from_rusqlite, transaction_state, Result};
use crate::repo::Repository;

/// The connection a session works on
///
/// A session closes an owned connection when it ends; a borrowed one is left
/// to its owner.
#[derive(Debug)]
pub enum ConnectionHandle<'c> {
    Owned(Connection),
    Borrowed(&'c Connection),
}

impl Deref for ConnectionHandle<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        match self {
            ConnectionHandle::Owned(conn) => conn,
            ConnectionHandle::Borrowed(conn) => conn,
        }
    }
}

/// One connection and at most one open transaction
///
/// Under [`TransactionPolicy::PerSession`] the first command begins the
/// transaction and every later command joins it until [`commit`]. A session
/// dropped or [disposed](UnitOfWork::dispose) with an open transaction rolls
/// it back.
///
/// [`commit`]: UnitOfWork::commit
#[derive(Debug)]
pub struct UnitOfWork<'c> {
    conn: ConnectionHandle<'c>,
    policy: TransactionPolicy,
    schema: String,
    session_id: SessionId,
    tx_open: Cell<bool>,
}

impl UnitOfWork<'static> {
    /// Start a session that owns `conn`
    pub fn owning(conn: Connection, settings: &ConnectionSettings) -> Self {
        Self::with_handle(ConnectionHandle::Owned(conn))
            .with_policy(settings.transaction_policy)
            .with_schema(settings.schema.clone())
    }
}

impl<'c> UnitOfWork<'c> {
    /// Start a session over a caller-supplied connection
    ///
    /// The connection is never closed by the session. If the caller already
    /// has a transaction open on it, commands run inside that transaction and
    /// the session does not begin its own.
    pub fn over_connection(conn: &'c Connection) -> Self {
        Self::with_handle(ConnectionHandle::Borrowed(conn))
    }

    fn with_handle(conn: ConnectionHandle<'c>) -> Self {
        let session = Self {
            conn,
            policy: TransactionPolicy::default(),
            schema: DEFAULT_SCHEMA.to_string(),
            session_id: SessionId::new(),
            tx_open: Cell::new(false),
        };
        debug!(
            session_id = %session.session_id,
            owned = session.owns_connection(),
            "session opened"
        );
        session
    }

    pub fn with_policy(mut self, policy: TransactionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Schema used for tables whose binding names none
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn policy(&self) -> TransactionPolicy {
        self.policy
    }

    pub fn default_schema(&self) -> &str {
        &self.schema
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn owns_connection(&self) -> bool {
        matches!(self.conn, ConnectionHandle::Owned(_))
    }

    /// Whether this session has a transaction open
    pub fn in_transaction(&self) -> bool {
        self.tx_open.get()
    }

    /// Empty command bound to this session
    ///
    /// # Errors
    /// `TransactionState` if the lazy transaction cannot begin.
    pub fn create_command(&self) -> Result<Command<'_>> {
        self.create_command_with(String::new())
    }

    /// Command with the given SQL text
    ///
    /// # Errors
    /// `TransactionState` if the lazy transaction cannot begin.
    pub fn create_command_with(&self, text: impl Into<String>) -> Result<Command<'_>> {
        self.ensure_transaction()?;
        Ok(Command::new(&self.conn, &self.session_id, text.into()))
    }

    /// Command carrying a built statement and its parameters
    ///
    /// # Errors
    /// `TransactionState` if the lazy transaction cannot begin.
    pub fn command_for(&self, statement: Statement) -> Result<Command<'_>> {
        self.ensure_transaction()?;
        Ok(Command::from_statement(
            &self.conn,
            &self.session_id,
            statement,
        ))
    }

    /// Typed repository for `T` bound to this session
    ///
    /// # Errors
    /// `Mapping` if the binding table of `T` is invalid.
    pub fn repository<T: Record>(&self) -> Result<Repository<'_, T>> {
        Repository::new(self)
    }

    /// Explicitly begin a transaction
    ///
    /// # Errors
    /// `TransactionState` if one is already open.
    pub fn begin(&self) -> Result<()> {
        self.observe("begin", || {
            if self.tx_open.get() {
                return Err(transaction_state("begin", "a transaction is already open"));
            }
            self.begin_now()
        })
    }

    /// Commit the open transaction
    ///
    /// # Errors
    /// `TransactionState` if no transaction is open or the engine refuses the
    /// commit.
    pub fn commit(&self) -> Result<()> {
        self.observe("commit", || {
            if !self.tx_open.get() {
                return Err(transaction_state("commit", "no transaction is open"));
            }
            let outcome = self
                .conn
                .execute_batch("COMMIT")
                .map_err(from_rusqlite(DalErrorKind::TransactionState, "commit"));
            // A failed COMMIT may leave the transaction open (busy) or not
            self.tx_open.set(!self.conn.is_autocommit());
            outcome
        })
    }

    /// Roll back the open transaction
    ///
    /// # Errors
    /// `TransactionState` if no transaction is open.
    pub fn rollback(&self) -> Result<()> {
        self.observe("rollback", || {
            if !self.tx_open.get() {
                return Err(transaction_state("rollback", "no transaction is open"));
            }
            self.rollback_now()
        })
    }

    /// End the session, rolling back any uncommitted transaction
    ///
    /// An owned connection is closed; a borrowed one is left open.
    ///
    /// # Errors
    /// `TransactionState` if the rollback fails. The session is ended either
    /// way.
    pub fn dispose(self) -> Result<()> {
        self.observe("dispose", || {
            if self.tx_open.get() {
                self.rollback_now()?;
            }
            Ok(())
        })
    }

    fn ensure_transaction(&self) -> Result<()> {
        if self.policy != TransactionPolicy::PerSession || self.tx_open.get() {
            return Ok(());
        }
        if !self.conn.is_autocommit() {
            debug!(
                session_id = %self.session_id,
                "joining transaction opened by the connection owner"
            );
            return Ok(());
        }
        self.begin_now()
    }

    fn begin_now(&self) -> Result<()> {
        self.conn
            .execute_batch("BEGIN")
            .map_err(from_rusqlite(DalErrorKind::TransactionState, "begin"))?;
        self.tx_open.set(true);
        debug!(session_id = %self.session_id, "transaction begun");
        Ok(())
    }

    fn rollback_now(&self) -> Result<()> {
        let outcome = self
            .conn
            .execute_batch("ROLLBACK")
            .map_err(from_rusqlite(DalErrorKind::TransactionState, "rollback"));
        self.tx_open.set(!self.conn.is_autocommit());
        outcome
    }

    fn observe<R>(&self, op: &'static str, f: impl FnOnce() -> Result<R>) -> Result<R> {
        log_op_start!(op, session_id = self.session_id.as_str());
        let start = Instant::now();

        let result = f().map_err(|e| {
            let e = e.with_session_id(self.session_id.clone());
            log_op_error!(
                op,
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                session_id = self.session_id.as_str()
            );
            e
        })?;

        log_op_end!(
            op,
            duration_ms = start.elapsed().as_millis() as u64,
            session_id = self.session_id.as_str()
        );
        Ok(result)
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        if !self.tx_open.get() {
            return;
        }
        if let Err(e) = self.rollback_now() {
            warn!(
                session_id = %self.session_id,
                error = %e,
                "rollback on drop failed"
            );
        } else {
            debug!(session_id = %self.session_id, "uncommitted transaction rolled back");
        }
    }
}
