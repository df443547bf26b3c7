//! Statement execution and transaction control.
//!
//! Single statements run without an explicit transaction and rely on the
//! store's per-statement atomicity. A batch runs inside one transaction:
//!
//! 1. Begin
//! 2. Execute each statement in order, stopping at the first failure
//! 3. On failure: roll back and return the statement's error. A rollback
//!    failure is logged, not returned.
//! 4. On success: commit and return the commit result. A commit failure is
//!    [`StorageError::Commit`]; rollback is never attempted after it.

use async_trait::async_trait;

use crate::storage::StorageError;
use crate::storage::db::{Connection, Session};
use crate::storage::error::DbError;
use crate::storage::types::{SqlValue, Statement};

/// Executes registered statements and owns connection teardown.
#[async_trait]
pub trait Executor: Send {
    /// Execute one registered statement outside any explicit transaction.
    async fn exec(&mut self, name: &'static str, args: &[SqlValue]) -> Result<(), StorageError>;

    /// Execute `batch` as one all-or-nothing unit.
    async fn exec_multiple(&mut self, batch: &[Statement]) -> Result<(), StorageError>;

    /// Release the underlying connection.
    async fn close(&mut self) -> Result<(), StorageError>;
}

/// Executes statements on a shared connection.
#[derive(Debug, Clone)]
pub struct PgExecutor<C> {
    session: Session<C>,
}

impl<C: Connection> PgExecutor<C> {
    pub fn new(session: Session<C>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<C: Connection> Executor for PgExecutor<C> {
    async fn exec(&mut self, name: &'static str, args: &[SqlValue]) -> Result<(), StorageError> {
        let mut guard = self.session.lock().await;
        let conn = guard.as_mut().ok_or(StorageError::Exec {
            name,
            source: DbError::Closed,
        })?;

        conn.execute_prepared(name, args)
            .await
            .map_err(|source| StorageError::Exec { name, source })?;

        Ok(())
    }

    async fn exec_multiple(&mut self, batch: &[Statement]) -> Result<(), StorageError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut guard = self.session.lock().await;
        let conn = guard
            .as_mut()
            .ok_or(StorageError::Begin(DbError::Closed))?;

        let mut tx = conn.begin().await.map_err(StorageError::Begin)?;

        for stmt in batch {
            let result = tx.execute_prepared(stmt.name, &stmt.args).await;
            if let Err(source) = result {
                if let Err(e) = tx.rollback().await {
                    tracing::warn!(error = %e, name = stmt.name, "Transaction rollback failed");
                }
                return Err(StorageError::TxExec {
                    name: stmt.name,
                    source,
                });
            }
        }

        tx.commit().await.map_err(|e| {
            tracing::error!(error = %e, count = batch.len(), "Transaction commit failed");
            StorageError::Commit(e)
        })
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        let Some(conn) = self.session.take().await else {
            tracing::debug!("Database connection already closed");
            return Ok(());
        };

        tracing::info!(endpoint = conn.endpoint(), "Closing database connection");
        conn.close().await.map_err(StorageError::Close)
    }
}
