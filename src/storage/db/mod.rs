//! Database abstraction layer.
//!
//! # Architecture
//!
//! - [`Connection`]: Capability set of one live store connection
//!   (execute, prepare named statement, begin transaction, close)
//! - [`Transaction`]: Capability set of an open transaction
//!   (execute named statement, commit, rollback)
//! - [`Session`]: Shared handle to the single connection owned by a sink
//! - [`PgSession`]: PostgreSQL implementation using sqlx
//!
//! The schema preparer, statement preparer and executor each hold
//! a clone of the same [`Session`]. Calls are serialised by the sink, so the
//! lock is never contended; it only lets the components share the one
//! connection without any of them owning it outright.

mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};

use crate::storage::error::DbError;
use crate::storage::types::SqlValue;

pub use postgres::{PgSession, PgTransaction};

/// One live connection to the backing store.
#[async_trait]
pub trait Connection: Send + 'static {
    /// Execute raw SQL with positional arguments. Returns rows affected.
    async fn execute(&mut self, sql: &str, args: &[SqlValue]) -> Result<u64, DbError>;

    /// Execute a statement previously registered with [`Connection::prepare`].
    async fn execute_prepared(&mut self, name: &str, args: &[SqlValue]) -> Result<u64, DbError>;

    /// Register `sql` on the connection under `name`.
    async fn prepare(&mut self, name: &str, sql: &str) -> Result<(), DbError>;

    /// Open a transaction. The connection is unusable until it is
    /// committed or rolled back.
    async fn begin<'c>(&'c mut self) -> Result<Box<dyn Transaction + 'c>, DbError>;

    /// Release the connection.
    async fn close(self) -> Result<(), DbError>
    where
        Self: Sized;

    /// `host:port` of the server, for logging.
    fn endpoint(&self) -> &str;
}

/// An open transaction.
///
/// `commit` and `rollback` consume the handle, so at most one of them can
/// ever run for a given transaction.
#[async_trait]
pub trait Transaction: Send {
    /// Execute a registered statement inside the transaction.
    async fn execute_prepared(&mut self, name: &str, args: &[SqlValue]) -> Result<u64, DbError>;

    async fn commit(self: Box<Self>) -> Result<(), DbError>;

    async fn rollback(self: Box<Self>) -> Result<(), DbError>;
}

/// Shared handle to a sink's connection.
///
/// Once [`Session::take`] has removed the connection, every holder sees it
/// as closed.
pub struct Session<C> {
    inner: Arc<Mutex<Option<C>>>,
}

impl<C> Clone for Session<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl<C: Connection> Session<C> {
    pub fn new(conn: C) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(conn))),
        }
    }

    /// Lock the connection slot. The slot is `None` after close.
    pub async fn lock(&self) -> MutexGuard<'_, Option<C>> {
        self.inner.lock().await
    }

    /// Remove the connection, leaving the session closed.
    pub async fn take(&self) -> Option<C> {
        self.inner.lock().await.take()
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.is_none()
    }
}
