use tracing::info;

use super::session::UnitOfWork;
use crate::config::{ConnectionSettings, DalConfig};
use crate::db;
use crate::errors::Result;

/// Opens sessions from configuration
///
/// Every session it creates owns a fresh connection.
#[derive(Debug, Clone, Default)]
pub struct UnitOfWorkFactory {
    config: DalConfig,
}

impl UnitOfWorkFactory {
    pub fn new(config: DalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DalConfig {
        &self.config
    }

    /// Session on the default connection
    ///
    /// # Errors
    /// `Configuration` if the default connection is missing, `Connection` if
    /// it cannot be opened.
    pub fn create(&self) -> Result<UnitOfWork<'static>> {
        let settings = self.config.default_connection()?;
        Self::open(&self.config.default, settings)
    }

    /// Session on a named connection
    ///
    /// # Errors
    /// `Configuration` for an unknown name, `Connection` if it cannot be
    /// opened.
    pub fn create_with_connection_name(&self, name: &str) -> Result<UnitOfWork<'static>> {
        let settings = self.config.connection(name)?;
        Self::open(name, settings)
    }

    /// Session on an ad-hoc target: `:memory:`, a file path or a `file:` URI
    ///
    /// The connection gets default settings.
    ///
    /// # Errors
    /// `Connection` if the target cannot be opened.
    pub fn create_with_connection_string(&self, target: &str) -> Result<UnitOfWork<'static>> {
        Self::open("<connection string>", &ConnectionSettings::new(target))
    }

    fn open(name: &str, settings: &ConnectionSettings) -> Result<UnitOfWork<'static>> {
        let conn = db::connect(settings)?;
        let session = UnitOfWork::owning(conn, settings);
        info!(
            session_id = %session.session_id(),
            connection = name,
            policy = ?settings.transaction_policy,
            "session created"
        );
        Ok(session)
    }
}
