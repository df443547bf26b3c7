//! Database schema definitions.

use async_trait::async_trait;

use crate::storage::StorageError;
use crate::storage::db::{Connection, Session};
use crate::storage::error::DbError;

/// Name of the event table.
pub const TCP_EVENTS_TABLE: &str = "tcp_events";

/// Name of the socket metadata table.
pub const SOCKET_INFO_TABLE: &str = "socket_info";

/// SQL statement for creating the tcp_events table.
pub const TCP_EVENTS_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS tcp_events (
    uid         TEXT PRIMARY KEY,
    timestamp   TIMESTAMP,
    pid_on_cpu  INTEGER,
    comm_on_cpu TEXT,
    src_ip      INET,
    dst_ip      INET,
    src_port    INTEGER,
    dst_port    INTEGER,
    old_state   TEXT,
    new_state   TEXT
)"#;

/// SQL statement for creating the socket_info table.
///
/// Rows reference their event and are removed with it.
/// Note: inode and ids are BIGINT so the full u32 range fits.
pub const SOCKET_INFO_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS socket_info (
    uid          TEXT PRIMARY KEY,
    event_uid    TEXT NOT NULL REFERENCES tcp_events (uid) ON DELETE CASCADE,
    socket_id    TEXT,
    inode        BIGINT,
    user_id      BIGINT,
    group_id     BIGINT,
    socket_state TEXT
)"#;

/// Tables in creation order; referenced tables come first.
const TABLES: [(&str, &str); 2] = [
    (TCP_EVENTS_TABLE, TCP_EVENTS_TABLE_DDL),
    (SOCKET_INFO_TABLE, SOCKET_INFO_TABLE_DDL),
];

/// Ensures the tables required to store events exist.
#[async_trait]
pub trait SchemaPreparer: Send {
    /// Create every table that is absent. A table that already exists is
    /// not an error.
    async fn create_tables(&mut self) -> Result<(), StorageError>;
}

/// Creates the event tables over a shared connection.
#[derive(Debug, Clone)]
pub struct PgSchemaPreparer<C> {
    session: Session<C>,
}

impl<C: Connection> PgSchemaPreparer<C> {
    pub fn new(session: Session<C>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<C: Connection> SchemaPreparer for PgSchemaPreparer<C> {
    async fn create_tables(&mut self) -> Result<(), StorageError> {
        let mut guard = self.session.lock().await;

        for (table, ddl) in TABLES {
            let conn = guard
                .as_mut()
                .ok_or(StorageError::CreateTable {
                    table,
                    source: DbError::Closed,
                })?;

            match conn.execute(ddl, &[]).await {
                Ok(_) => tracing::debug!(table, "Table ensured"),
                Err(DbError::DuplicateRelation(_)) => {
                    // Only SQLSTATE 42P07 lands here; 23505 from a concurrent create is fatal.
                    tracing::debug!(table, "Table already exists");
                }
                Err(source) => return Err(StorageError::CreateTable { table, source }),
            }
        }

        tracing::info!("Database schema initialized");
        Ok(())
    }
}
