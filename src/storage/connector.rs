//! Connection establishment.

use async_trait::async_trait;

use crate::config::ConfigSource;
use crate::storage::StorageError;
use crate::storage::db::{Connection, PgSession};

/// Establishes one live connection to the backing store.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connection type produced.
    type Connection: Connection;

    /// Resolve connection parameters and connect.
    async fn connect(&self) -> Result<Self::Connection, StorageError>;
}

/// Connects to PostgreSQL using the connection string supplied by a
/// [`ConfigSource`].
#[derive(Debug, Clone)]
pub struct PgConnector<S> {
    source: S,
}

impl<S: ConfigSource> PgConnector<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S: ConfigSource> Connector for PgConnector<S> {
    type Connection = PgSession;

    async fn connect(&self) -> Result<PgSession, StorageError> {
        let conn_str = self.source.config()?;

        PgSession::connect(&conn_str)
            .await
            .map_err(StorageError::Connect)
    }
}
