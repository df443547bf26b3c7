//! Named statement registration.

use async_trait::async_trait;

use crate::storage::StorageError;
use crate::storage::db::{Connection, Session};
use crate::storage::error::DbError;

/// Registers named parameterised statements for later execution by name.
#[async_trait]
pub trait StatementPreparer: Send {
    async fn prepare_statement(
        &mut self,
        sql: &'static str,
        name: &'static str,
    ) -> Result<(), StorageError>;
}

/// Registers statements on a shared connection.
#[derive(Debug, Clone)]
pub struct PgStatementPreparer<C> {
    session: Session<C>,
}

impl<C: Connection> PgStatementPreparer<C> {
    pub fn new(session: Session<C>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<C: Connection> StatementPreparer for PgStatementPreparer<C> {
    async fn prepare_statement(
        &mut self,
        sql: &'static str,
        name: &'static str,
    ) -> Result<(), StorageError> {
        let mut guard = self.session.lock().await;
        let conn = guard.as_mut().ok_or(StorageError::PrepareStatement {
            name,
            source: DbError::Closed,
        })?;

        conn.prepare(name, sql)
            .await
            .map_err(|source| StorageError::PrepareStatement { name, source })?;

        tracing::debug!(name, "Statement prepared");
        Ok(())
    }
}
