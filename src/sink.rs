//! Sink facade.
//!
//! [`Sink`] is the entry point used by the event pipeline. Construction runs
//! the full setup sequence (connect, create tables, register statements)
//! and either yields a ready sink or fails as a whole. After that the sink
//! accepts one [`Event`] at a time.
//!
//! # Example
//!
//! ```rust,ignore
//! use tcp_audit_pg::{EnvVarConfigSource, PgSink, SinkConfig};
//!
//! let mut sink = PgSink::connect(EnvVarConfigSource::new(), &SinkConfig::default()).await?;
//! sink.sink(&event).await?;
//! sink.close().await?;
//! ```

use std::future::Future;
use std::time::Duration;

use uuid::Uuid;

use crate::config::{ConfigSource, SinkConfig};
use crate::event::{Event, SocketInfo};
use crate::storage::db::{Connection, PgSession, Session};
use crate::storage::{
    Connector, EventRow, Inserter, PgConnector, PgExecutor, PgSchemaPreparer, PgStatementPreparer,
    PreparedStatementInserter, SchemaPreparer, SocketInfoRow, StorageError,
};

/// Inserter stack used over a live connection.
pub type SessionInserter<C> = PreparedStatementInserter<PgStatementPreparer<C>, PgExecutor<C>>;

/// Sink writing to PostgreSQL.
pub type PgSink = Sink<SessionInserter<PgSession>>;

/// Persists TCP state-change events.
///
/// Calls must be serialised by the caller; one sink owns one connection.
pub struct Sink<I> {
    inserter: I,
    operation_timeout: Option<Duration>,
}

impl<I> std::fmt::Debug for Sink<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sink")
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}

impl<I: Inserter> Sink<I> {
    /// Create tables, then register statements.
    ///
    /// On failure the inserter is closed (best effort) and the setup error
    /// is returned.
    pub async fn new<S>(
        schema: &mut S,
        mut inserter: I,
        config: &SinkConfig,
    ) -> Result<Self, StorageError>
    where
        S: SchemaPreparer + ?Sized,
    {
        let timeout = config.operation_timeout;

        if let Err(e) = setup(schema, &mut inserter, timeout).await {
            tracing::error!(error = %e, "Sink setup failed");
            if let Err(close_err) = with_deadline(timeout, "close", inserter.close()).await {
                tracing::warn!(error = %close_err, "Failed to close after setup failure");
            }
            return Err(e);
        }

        tracing::info!("Sink ready");
        Ok(Self {
            inserter,
            operation_timeout: timeout,
        })
    }

    /// Persist one event and, if present, its socket metadata.
    ///
    /// Fresh identifiers are generated for every row on every call.
    pub async fn sink(&mut self, event: &Event) -> Result<(), StorageError> {
        let row = event_row(event);
        let socket_info = event.socket_info.as_ref().map(socket_info_row);

        with_deadline(
            self.operation_timeout,
            "insert",
            self.inserter.insert(row, socket_info),
        )
        .await
    }

    /// Release the connection. Calling it again is a no-op.
    pub async fn close(&mut self) -> Result<(), StorageError> {
        with_deadline(self.operation_timeout, "close", self.inserter.close()).await
    }
}

impl<C: Connection> Sink<SessionInserter<C>> {
    /// Connect through `connector` and run the full setup sequence.
    pub async fn from_connector<K>(connector: &K, config: &SinkConfig) -> Result<Self, StorageError>
    where
        K: Connector<Connection = C>,
    {
        let conn = with_deadline(config.operation_timeout, "connect", connector.connect()).await?;

        let session = Session::new(conn);
        let mut schema = PgSchemaPreparer::new(session.clone());
        let inserter = PreparedStatementInserter::new(
            PgStatementPreparer::new(session.clone()),
            PgExecutor::new(session),
        );

        Self::new(&mut schema, inserter, config).await
    }
}

impl PgSink {
    /// Connect to PostgreSQL using the descriptor from `source`.
    pub async fn connect<S: ConfigSource>(
        source: S,
        config: &SinkConfig,
    ) -> Result<Self, StorageError> {
        Self::from_connector(&PgConnector::new(source), config).await
    }
}

async fn setup<S, I>(
    schema: &mut S,
    inserter: &mut I,
    timeout: Option<Duration>,
) -> Result<(), StorageError>
where
    S: SchemaPreparer + ?Sized,
    I: Inserter,
{
    with_deadline(timeout, "create_tables", schema.create_tables()).await?;
    with_deadline(timeout, "prepare", inserter.prepare()).await
}

/// Run `fut`, failing with [`StorageError::Timeout`] once `timeout` elapses.
async fn with_deadline<T, F>(
    timeout: Option<Duration>,
    op: &'static str,
    fut: F,
) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    match timeout {
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| StorageError::Timeout { op, after })?,
        None => fut.await,
    }
}

fn event_row(event: &Event) -> EventRow {
    EventRow {
        uid: Uuid::new_v4().to_string(),
        time: event.time,
        pid_on_cpu: event.pid_on_cpu,
        comm_on_cpu: event.command_on_cpu.clone(),
        src_ip: event.source_ip,
        dst_ip: event.dest_ip,
        src_port: event.source_port,
        dst_port: event.dest_port,
        old_state: event.old_state.to_string(),
        new_state: event.new_state.to_string(),
    }
}

fn socket_info_row(info: &SocketInfo) -> SocketInfoRow {
    SocketInfoRow {
        uid: Uuid::new_v4().to_string(),
        socket_id: info.id.clone(),
        inode: info.inode,
        user_id: info.uid,
        group_id: info.gid,
        state: info.state.to_string(),
    }
}
