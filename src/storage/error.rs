//! Storage-specific error types.
//!
//! [`DbError`] is what a connection or transaction handle reports.
//! [`StorageError`] wraps it with the stage that produced it; every
//! storage and sink operation returns it on failure.

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors reported by a connection or transaction handle.
#[derive(Debug, Error)]
pub enum DbError {
    /// A `CREATE` targeted a relation that already exists (SQLSTATE 42P07).
    #[error("relation already exists: {0}")]
    DuplicateRelation(String),

    /// A statement name was used before being registered on the connection.
    #[error("no prepared statement named {0:?}")]
    UnknownStatement(String),

    /// The connection has already been released.
    #[error("connection is closed")]
    Closed,

    /// Any other driver-level failure.
    #[error(transparent)]
    Driver(#[from] sqlx::Error),
}

/// Errors that can occur in the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Connection parameters could not be obtained.
    #[error("getting connection string from config: {0}")]
    Config(#[from] ConfigError),

    /// Establishing the connection failed.
    #[error("establishing connection to database: {0}")]
    Connect(#[source] DbError),

    /// Creating a table failed for a reason other than it already existing.
    #[error("creating {table} table: {source}")]
    CreateTable {
        table: &'static str,
        #[source]
        source: DbError,
    },

    /// Registering a named statement failed.
    #[error("preparing {name} statement: {source}")]
    PrepareStatement {
        name: &'static str,
        #[source]
        source: DbError,
    },

    /// A single non-transactional statement failed.
    #[error("execing {name} on connection: {source}")]
    Exec {
        name: &'static str,
        #[source]
        source: DbError,
    },

    /// Opening a transaction failed.
    #[error("beginning transaction: {0}")]
    Begin(#[source] DbError),

    /// A statement inside a transaction failed; the transaction was rolled back.
    #[error("execing {name} in transaction: {source}")]
    TxExec {
        name: &'static str,
        #[source]
        source: DbError,
    },

    /// Every statement executed but the commit failed. Durability of the
    /// writes is unknown.
    #[error("committing transaction (writes may or may not be durable): {0}")]
    Commit(#[source] DbError),

    /// Releasing the connection failed.
    #[error("closing connection: {0}")]
    Close(#[source] DbError),

    /// Writing an event's rows failed.
    #[error("inserting into {table}: {source}")]
    Insert {
        table: &'static str,
        #[source]
        source: Box<StorageError>,
    },

    /// The operation did not complete before its deadline.
    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },
}

impl StorageError {
    /// Whether this error leaves the outcome of a write unknown: the
    /// statements ran but their commit could not be confirmed.
    pub fn is_ambiguous_durability(&self) -> bool {
        match self {
            Self::Commit(_) => true,
            Self::Insert { source, .. } => source.is_ambiguous_durability(),
            _ => false,
        }
    }
}
