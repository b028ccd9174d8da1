use std::sync::Arc;

use dalkit_core_types::SessionId;

/// Result type alias using DalError
pub type Result<T> = std::result::Result<T, DalError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure that crosses a public dalkit boundary is classified by one of
/// these kinds. Each kind maps to a stable error code that callers and tests
/// can match on without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DalErrorKind {
    // Connection / session
    Connection,
    TransactionState,
    Configuration,

    // Statement execution
    QueryFailed,
    InsertFailed,
    UpdateFailed,
    DeleteFailed,

    // Row <-> record mapping
    Mapping,

    // Caller-facing lookups and arguments
    NotFound,
    InvalidInput,

    /// An operation that is deliberately outside the data-access core
    NotImplemented,
}

impl DalErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            DalErrorKind::Connection => "ERR_CONNECTION",
            DalErrorKind::TransactionState => "ERR_TRANSACTION_STATE",
            DalErrorKind::Configuration => "ERR_CONFIGURATION",
            DalErrorKind::QueryFailed => "ERR_QUERY_FAILED",
            DalErrorKind::InsertFailed => "ERR_INSERT_FAILED",
            DalErrorKind::UpdateFailed => "ERR_UPDATE_FAILED",
            DalErrorKind::DeleteFailed => "ERR_DELETE_FAILED",
            DalErrorKind::Mapping => "ERR_MAPPING",
            DalErrorKind::NotFound => "ERR_NOT_FOUND",
            DalErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            DalErrorKind::NotImplemented => "ERR_NOT_IMPLEMENTED",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification (`kind`) for programmatic handling plus optional
/// context describing where the failure happened. The underlying engine or
/// conversion error, when there is one, is kept as `source`.
#[derive(Debug, Clone)]
pub struct DalError {
    kind: DalErrorKind,
    op: Option<String>,
    entity: Option<String>,
    record_id: Option<String>,
    column: Option<String>,
    session_id: Option<SessionId>,
    message: String,
    source: Option<Arc<dyn std::error::Error + Send + Sync + 'static>>,
}

impl DalError {
    /// Create a new error with the specified kind
    pub fn new(kind: DalErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity: None,
            record_id: None,
            column: None,
            session_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the record type the operation was acting on
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Add record ID context
    pub fn with_record_id(mut self, id: impl Into<String>) -> Self {
        self.record_id = Some(id.into());
        self
    }

    /// Add column / field context
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Add session context
    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> DalErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the record type context, if any
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// Get the record ID context, if any
    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    /// Get the column context, if any
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    /// Get the session context, if any
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Re-classify an error while keeping its context
    ///
    /// Used at operation boundaries, where a lower-level failure (for example a
    /// constraint violation raised while executing an insert) is reported under
    /// the kind of the operation that was running.
    pub fn rekind(mut self, kind: DalErrorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Fill in the operation name unless a lower layer already set one
    pub fn or_op(mut self, op: impl Into<String>) -> Self {
        if self.op.is_none() {
            self.op = Some(op.into());
        }
        self
    }
}

impl std::fmt::Display for DalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity) = &self.entity {
            write!(f, " (entity: {})", entity)?;
        }
        if let Some(record_id) = &self.record_id {
            write!(f, " (record_id: {})", record_id)?;
        }
        if let Some(column) = &self.column {
            write!(f, " (column: {})", column)?;
        }
        if let Some(source) = &self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for DalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Shorthand for the "not implemented in the core" failure
pub fn not_implemented(op: &str, reason: &str) -> DalError {
    DalError::new(DalErrorKind::NotImplemented)
        .with_op(op.to_string())
        .with_message(reason.to_string())
}

/// Shorthand for an invalid caller argument
pub fn invalid_input(op: &str, reason: impl Into<String>) -> DalError {
    DalError::new(DalErrorKind::InvalidInput)
        .with_op(op.to_string())
        .with_message(reason)
}
